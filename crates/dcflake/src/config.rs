use crate::{Error, Result, SnowflakeId};

/// Environment variable read by [`NodeConfig::from_env`] for the data-center
/// ID.
pub const DATA_CENTER_ID_ENV: &str = "DCFLAKE_DATA_CENTER_ID";

/// Environment variable read by [`NodeConfig::from_env`] for the machine ID.
pub const MACHINE_ID_ENV: &str = "DCFLAKE_MACHINE_ID";

/// Largest accepted data-center ID.
pub const MAX_DATA_CENTER_ID: u8 = SnowflakeId::DATA_CENTER_ID_MASK as u8;

/// Largest accepted machine ID.
pub const MAX_MACHINE_ID: u8 = SnowflakeId::MACHINE_ID_MASK as u8;

/// The static identity of one generator node.
///
/// Uniqueness across nodes holds only while no two live generators share the
/// same `(data_center_id, machine_id)` pair. Handing out pairs is the
/// deployment's job.
///
/// A `NodeConfig` obtained from [`NodeConfig::new`], [`NodeConfig::from_env`]
/// or deserialization is always in range.
///
/// # Example
///
/// ```
/// use dcflake::NodeConfig;
///
/// let config = NodeConfig::new(1, 0).unwrap();
/// assert_eq!(config.data_center_id(), 1);
/// assert!(NodeConfig::new(2, 0).is_err());
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawNodeConfig"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct NodeConfig {
    data_center_id: u8,
    machine_id: u8,
}

impl NodeConfig {
    /// Builds a validated node identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if either ID does not fit into its
    /// 1-bit field.
    pub fn new(data_center_id: u64, machine_id: u64) -> Result<Self> {
        let data_center_id = check("data_center_id", data_center_id, MAX_DATA_CENTER_ID)?;
        let machine_id = check("machine_id", machine_id, MAX_MACHINE_ID)?;
        Ok(Self {
            data_center_id,
            machine_id,
        })
    }

    /// Reads the node identity from [`DATA_CENTER_ID_ENV`] and
    /// [`MACHINE_ID_ENV`]. Unset variables default to `0`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEnv`] if a variable is set but is not an
    /// unsigned integer, and [`Error::Configuration`] if it is out of range.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |var: &'static str| -> Result<u64> {
            match lookup(var) {
                None => Ok(0),
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| Error::InvalidEnv { var, value }),
            }
        };
        Self::new(read(DATA_CENTER_ID_ENV)?, read(MACHINE_ID_ENV)?)
    }

    /// Re-checks both fields against their bit widths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for the first out-of-range field.
    pub fn validate(&self) -> Result<()> {
        Self::new(self.data_center_id.into(), self.machine_id.into()).map(|_| ())
    }

    /// The data-center bit stamped into every ID.
    pub const fn data_center_id(&self) -> u8 {
        self.data_center_id
    }

    /// The machine bit stamped into every ID.
    pub const fn machine_id(&self) -> u8 {
        self.machine_id
    }
}

impl TryFrom<(u64, u64)> for NodeConfig {
    type Error = Error;

    fn try_from((data_center_id, machine_id): (u64, u64)) -> Result<Self> {
        Self::new(data_center_id, machine_id)
    }
}

fn check(field: &'static str, value: u64, max: u8) -> Result<u8> {
    if value > u64::from(max) {
        return Err(Error::Configuration {
            field,
            value,
            max: u64::from(max),
        });
    }
    Ok(value as u8)
}

/// Unvalidated wire form of [`NodeConfig`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawNodeConfig {
    #[serde(default)]
    data_center_id: u64,
    #[serde(default)]
    machine_id: u64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawNodeConfig> for NodeConfig {
    type Error = Error;

    fn try_from(raw: RawNodeConfig) -> Result<Self> {
        Self::new(raw.data_center_id, raw.machine_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn accepts_every_in_range_pair() {
        for dc in 0..=1 {
            for machine in 0..=1 {
                let config = NodeConfig::new(dc, machine).unwrap();
                assert_eq!(u64::from(config.data_center_id()), dc);
                assert_eq!(u64::from(config.machine_id()), machine);
                assert_eq!(config.validate(), Ok(()));
            }
        }
    }

    #[test]
    fn rejects_out_of_range_data_center_id() {
        assert_eq!(
            NodeConfig::new(2, 0),
            Err(Error::Configuration {
                field: "data_center_id",
                value: 2,
                max: 1,
            })
        );
    }

    #[test]
    fn rejects_out_of_range_machine_id() {
        assert_eq!(
            NodeConfig::new(0, u64::MAX),
            Err(Error::Configuration {
                field: "machine_id",
                value: u64::MAX,
                max: 1,
            })
        );
    }

    #[test]
    fn tuple_conversion_validates() {
        assert!(NodeConfig::try_from((1, 1)).is_ok());
        assert!(NodeConfig::try_from((1, 3)).is_err());
    }

    #[test]
    fn lookup_defaults_to_zero() {
        let config = NodeConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config, NodeConfig::default());
    }

    #[test]
    fn lookup_reads_both_variables() {
        let config = NodeConfig::from_lookup(env(&[
            (DATA_CENTER_ID_ENV, "1"),
            (MACHINE_ID_ENV, " 1 "),
        ]))
        .unwrap();
        assert_eq!(config, NodeConfig::new(1, 1).unwrap());
    }

    #[test]
    fn lookup_rejects_garbage() {
        let err = NodeConfig::from_lookup(env(&[(MACHINE_ID_ENV, "one")])).unwrap_err();
        assert_eq!(err, Error::InvalidEnv {
            var: MACHINE_ID_ENV,
            value: "one".to_owned(),
        });
    }

    #[test]
    fn lookup_rejects_out_of_range() {
        let err = NodeConfig::from_lookup(env(&[(DATA_CENTER_ID_ENV, "7")])).unwrap_err();
        assert!(matches!(err, Error::Configuration { value: 7, .. }));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_validates() {
        let config: NodeConfig =
            serde_json::from_str(r#"{"data_center_id":1,"machine_id":0}"#).unwrap();
        assert_eq!(config, NodeConfig::new(1, 0).unwrap());

        let config: NodeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, NodeConfig::default());

        let err = serde_json::from_str::<NodeConfig>(r#"{"data_center_id":2}"#).unwrap_err();
        assert!(err.to_string().contains("data_center_id"));

        let json = serde_json::to_string(&NodeConfig::new(0, 1).unwrap()).unwrap();
        assert_eq!(json, r#"{"data_center_id":0,"machine_id":1}"#);
    }
}
