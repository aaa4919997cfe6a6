use std::fs;
use std::num::ParseIntError;
use std::path::Path;

use crate::{
    memory::addr::{OFFSET_BITS, PAGE_SIZE, PFN_BITS, VPN_BITS},
    memory::page::TABLE_BITS,
    utils::bits,
};

const DEFAULT_TLB_ENTRIES: u32 = 64;
const DEFAULT_PHYS_FRAMES: u32 = 256;
const MAX_PHYS_FRAMES: u32 = 1 << PFN_BITS;
pub(crate) const MAX_TLB_ENTRIES: u32 = 1 << 16;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected `key: value`, found {text:?}")]
    Malformed { line: usize, text: String },
    #[error("line {line}: unknown option {key:?}")]
    UnknownKey { line: usize, key: String },
    #[error("line {line}: option {key:?} given more than once")]
    DuplicateKey { line: usize, key: String },
    #[error("option {key:?} has invalid value {value:?}: {source}")]
    InvalidNumber {
        key: String,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("{0} TLB entries specified but the TLB size must be a power of two from 1 to 65536")]
    TlbCapacity(u32),
    #[error("{0} physical frames specified but the range is 1 to 1048576")]
    FrameCount(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlbConfig {
    pub entries: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalConfig {
    pub frames: u32,
}

/// How often the simulated kernel touches the TLB behind the CPU's back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    /// Accesses between clearing every referenced bit, 0 to never clear
    pub reference_clear_interval: u32,
    /// Accesses between writing the TLB back to the bitmaps, 0 to never flush
    pub flush_interval: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub tlb: TlbConfig,
    pub phys: PhysicalConfig,
    pub kernel: KernelConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            tlb: TlbConfig { entries: DEFAULT_TLB_ENTRIES },
            phys: PhysicalConfig { frames: DEFAULT_PHYS_FRAMES },
            kernel: KernelConfig {
                reference_clear_interval: 0,
                flush_interval: 0,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path)?;
        Config::parse(&text)
    }

    /// Parses `key: value` lines on top of the defaults. Blank lines and `#` comments are
    /// skipped; keys are case-insensitive.
    pub fn parse(text: &str) -> Result<Config, ConfigError> {
        let mut config = Config::default();
        let mut seen = Vec::<&'static str>::new();

        let lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        for (line_no, line) in lines {
            let Some((key, value)) = line.split_once(':') else {
                return Err(ConfigError::Malformed { line: line_no, text: line.to_owned() });
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            let (name, slot): (&'static str, &mut u32) = match key.as_str() {
                "tlb entries" => ("tlb entries", &mut config.tlb.entries),
                "physical frames" => ("physical frames", &mut config.phys.frames),
                "reference clear interval" => (
                    "reference clear interval",
                    &mut config.kernel.reference_clear_interval,
                ),
                "flush interval" => ("flush interval", &mut config.kernel.flush_interval),
                _ => return Err(ConfigError::UnknownKey { line: line_no, key: key.clone() }),
            };
            if seen.contains(&name) {
                return Err(ConfigError::DuplicateKey { line: line_no, key });
            }
            seen.push(name);

            *slot = value.parse::<u32>().map_err(|source| ConfigError::InvalidNumber {
                key: name.to_owned(),
                value: value.to_owned(),
                source,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the limits the simulator relies on. Call again after overriding fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !bits::is_pow2(self.tlb.entries) || self.tlb.entries > MAX_TLB_ENTRIES {
            return Err(ConfigError::TlbCapacity(self.tlb.entries));
        }
        if self.phys.frames == 0 || self.phys.frames > MAX_PHYS_FRAMES {
            return Err(ConfigError::FrameCount(self.phys.frames));
        }
        Ok(())
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Data TLB contains {} entries.", self.tlb.entries)?;
        writeln!(f, "The TLB is fully associative with NRU clock replacement.")?;
        writeln!(f, "Number of bits used for the TLB slot index is {}.",
            bits::min_bits(self.tlb.entries))?;
        writeln!(f)?;

        writeln!(f, "Number of virtual pages is {}.", 1u64 << VPN_BITS)?;
        writeln!(f, "Number of physical frames is {}.", self.phys.frames)?;
        writeln!(f, "Each page contains {} bytes.", PAGE_SIZE)?;
        writeln!(f, "Number of bits used for each page table index is {}.", TABLE_BITS)?;
        writeln!(f, "Number of bits used for the page offset is {}.", OFFSET_BITS)?;
        writeln!(f)?;

        match self.kernel.reference_clear_interval {
            0 => writeln!(f, "Referenced bits are never cleared.")?,
            n => writeln!(f, "Referenced bits are cleared every {} accesses.", n)?,
        }
        match self.kernel.flush_interval {
            0 => writeln!(f, "The TLB is only written back on eviction.")?,
            n => writeln!(f, "The TLB is written back every {} accesses.", n)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(Config::parse("").unwrap(), config);
    }

    #[test]
    fn parses_all_options() {
        let text = "\
# small machine
TLB entries: 8
Physical frames: 16

reference clear interval: 100
flush interval: 25
";
        let config = Config::parse(text).unwrap();
        assert_eq!(config.tlb.entries, 8);
        assert_eq!(config.phys.frames, 16);
        assert_eq!(config.kernel.reference_clear_interval, 100);
        assert_eq!(config.kernel.flush_interval, 25);
    }

    #[test]
    fn rejects_bad_tlb_size() {
        assert!(matches!(
            Config::parse("tlb entries: 48"),
            Err(ConfigError::TlbCapacity(48))
        ));
        assert!(matches!(
            Config::parse("tlb entries: 0"),
            Err(ConfigError::TlbCapacity(0))
        ));
        assert!(matches!(
            Config::parse("tlb entries: 2147483648"),
            Err(ConfigError::TlbCapacity(2147483648))
        ));
        assert!(Config::parse("tlb entries: 65536").is_ok());
    }

    #[test]
    fn rejects_bad_frame_count() {
        assert!(matches!(
            Config::parse("physical frames: 0"),
            Err(ConfigError::FrameCount(0))
        ));
        assert!(matches!(
            Config::parse("physical frames: 2000000"),
            Err(ConfigError::FrameCount(2000000))
        ));
    }

    #[test]
    fn reports_line_numbers() {
        match Config::parse("tlb entries: 4\n\nbogus") {
            Err(ConfigError::Malformed { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected {:?}", other),
        }
        match Config::parse("tlb entries: 4\ncolor: blue") {
            Err(ConfigError::UnknownKey { line, key }) => {
                assert_eq!(line, 2);
                assert_eq!(key, "color");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            Config::parse("tlb entries: 4\nTLB Entries: 8"),
            Err(ConfigError::DuplicateKey { line: 2, .. })
        ));
    }

    #[test]
    fn rejects_non_numbers() {
        assert!(matches!(
            Config::parse("flush interval: soon"),
            Err(ConfigError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vm.config");
        std::fs::write(&path, "tlb entries: 16\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.tlb.entries, 16);

        assert!(matches!(
            Config::from_file(dir.path().join("missing.config")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn summary_mentions_sizes() {
        let summary = Config::default().to_string();
        assert!(summary.contains("Data TLB contains 64 entries."));
        assert!(summary.contains("Number of bits used for the TLB slot index is 6."));
        assert!(summary.contains("Each page contains 4096 bytes."));
    }
}
