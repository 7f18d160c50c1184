//! This is the `ConfigEngine` struct.
//!
//! Finds the right default location for the `ridsentineld` configuration file and loads it.
//! This is a configuration-file-struct-neutral loading engine: it only knows the base
//! directory name and, with `load()`, reads the proper file (or the platform default).
//!

use crate::makepath;

use directories::BaseDirs;
use eyre::Result;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::{env, fs};
use tracing::{debug, error, trace};

/// Config filename
const CONFIG: &str = "config.yaml";

/// Main name for the directory base
const TAG: &str = "ridsentinel";

/// Implemented by every top-level configuration struct so `ConfigEngine` can sanity-check
/// the file it just loaded against the version the binary expects.
pub trait Versioned {
    fn version(&self) -> usize;
}

/// Generic YAML configuration loader, parameterized over the concrete config struct.
///
#[derive(Debug)]
pub struct ConfigEngine<T: Debug + DeserializeOwned + Versioned> {
    tag: String,
    basedir: PathBuf,
    _a: PhantomData<T>,
}

impl<T> ConfigEngine<T>
where
    T: Debug + DeserializeOwned + Versioned,
{
    #[tracing::instrument]
    fn new(tag: &str) -> Self {
        let base = BaseDirs::new();

        let basedir: PathBuf = match base {
            Some(base) => {
                let base = base.config_local_dir().to_string_lossy().to_string();
                debug!("base = {base}");
                let base: PathBuf = makepath!(base, tag);
                base
            }
            None => {
                #[cfg(unix)]
                let homedir = std::env::var("HOME")
                    .map_err(|_| error!("No HOME variable defined, can not continue"))
                    .unwrap();

                #[cfg(windows)]
                let homedir = env::var("LOCALAPPDATA")
                    .map_err(|_| error!("No LOCALAPPDATA variable defined, can not continue"))
                    .unwrap();

                debug!("base = {homedir}");

                #[cfg(unix)]
                let base: PathBuf = makepath!(homedir, ".config", tag);

                #[cfg(windows)]
                let base: PathBuf = makepath!(homedir, tag);

                base
            }
        };
        ConfigEngine {
            tag: String::from(tag),
            basedir,
            _a: PhantomData,
        }
    }

    /// Returns the path of the default config directory
    ///
    #[tracing::instrument]
    pub fn config_path(&self) -> PathBuf {
        self.basedir.clone()
    }

    /// Returns the path of the default config file
    ///
    #[tracing::instrument]
    pub fn default_file(&self) -> PathBuf {
        let cfg = self.config_path().join(CONFIG);
        debug!("default = {cfg:?}");
        cfg
    }

    /// Load the given file, or the platform default if `fname` is `None`.
    #[tracing::instrument]
    pub fn load(fname: Option<&str>) -> Result<T> {
        trace!("loading config");

        let cfg = ConfigEngine::<T>::new(TAG);

        let fname = match fname {
            Some(fname) => PathBuf::from(fname),
            None => cfg.default_file(),
        };

        trace!("Loading {fname:?}");
        let data = fs::read_to_string(fname)?;
        debug!("string data = {data}");

        let data: T = serde_yaml::from_str(&data)?;
        debug!("struct data = {data:?}");

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, Deserialize)]
    struct Foo {
        version: usize,
        pub name: String,
    }

    impl Versioned for Foo {
        fn version(&self) -> usize {
            self.version
        }
    }

    #[test]
    fn test_configengine_default_file_under_tag_dir() {
        let cfg = ConfigEngine::<Foo>::new(TAG);
        assert!(cfg.config_path().ends_with(TAG));
        assert!(cfg.default_file().ends_with(CONFIG));
    }
}
