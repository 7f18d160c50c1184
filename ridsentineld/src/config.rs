//! Configuration module
//!
//! This is where most of the initialisation code lies. We load the YAML config,
//! merge it with whatever the command line overrides, and turn the result into the
//! plain structs the orchestrator and engine crate actually run on.
//!
//! Version History:
//!
//! - v1 is the initial layout: acquisition, preprocessing, mqtt, system, data_fusion,
//!   remote_id.wifi, remote_id.ble.
//!

use ridsentinel_common::{GeofenceZone, Versioned};
use ridsentinel_engine::dsp::{Normalization, PreprocessorConfig};
use ridsentinel_engine::orchestrator::ThreatLimits;
use ridsentinel_macros::into_configfile;
use serde::{Deserialize, Serialize};

/// Config filename
pub const CONFIG: &str = "config.yaml";

/// Current version
pub const CVERSION: usize = 1;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AcquisitionConfig {
    /// Driver-specific device selector string, passed verbatim to the Sample Source.
    pub device_args: String,
    pub sample_rate_hz: f64,
    pub center_freq_hz: u64,
    pub gain_db: f32,
    pub antenna: String,
    pub acquire_timeout_s: u64,
    pub queue_depth: usize,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            device_args: String::new(),
            sample_rate_hz: 20_000_000.0,
            center_freq_hz: 2_412_000_000,
            gain_db: 30.0,
            antenna: "TX/RX".to_string(),
            acquire_timeout_s: 3,
            queue_depth: 10,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationKind {
    #[default]
    Rms,
    Peak,
    MinMax,
}

impl From<NormalizationKind> for Normalization {
    fn from(kind: NormalizationKind) -> Self {
        match kind {
            NormalizationKind::Rms => Normalization::Rms,
            NormalizationKind::Peak => Normalization::Peak,
            NormalizationKind::MinMax => Normalization::MinMax,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PreprocessingConfig {
    pub bandpass_low_hz: f64,
    pub bandpass_high_hz: f64,
    pub normalization: NormalizationKind,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        let defaults = PreprocessorConfig::default();
        Self {
            bandpass_low_hz: defaults.bandpass_low_hz,
            bandpass_high_hz: defaults.bandpass_high_hz,
            normalization: NormalizationKind::default(),
        }
    }
}

impl From<&PreprocessingConfig> for PreprocessorConfig {
    fn from(cfg: &PreprocessingConfig) -> Self {
        Self {
            bandpass_low_hz: cfg.bandpass_low_hz,
            bandpass_high_hz: cfg.bandpass_high_hz,
            normalization: cfg.normalization.into(),
        }
    }
}

/// Pub/sub connection settings. Named `mqtt` per the external-interfaces section, even
/// though the concrete sink shipped here speaks AMQP.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MqttConfig {
    pub amqp_url: String,
    pub exchange: String,
    pub publish_timeout_s: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            amqp_url: "amqp://127.0.0.1:5672/%2f".to_string(),
            exchange: "ridsentinel".to_string(),
            publish_timeout_s: 5,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SystemConfig {
    pub heartbeat_interval_s: u64,
    pub hop_interval_s: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_s: 60,
            hop_interval_s: 2,
        }
    }
}

/// One restricted zone, as written in the config file; converted to a
/// [`GeofenceZone`] at load time.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ZoneConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl From<&ZoneConfig> for GeofenceZone {
    fn from(z: &ZoneConfig) -> Self {
        GeofenceZone::new(&z.name, z.latitude, z.longitude, z.radius_km)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DataFusionConfig {
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
    pub operator_latitude: Option<f64>,
    pub operator_longitude: Option<f64>,
    pub height_agl_limit_m: Option<f32>,
    pub speed_limit_mps: Option<f32>,
    pub operator_distance_limit_m: Option<f64>,
}

impl DataFusionConfig {
    pub fn zones(&self) -> Vec<GeofenceZone> {
        self.zones.iter().map(GeofenceZone::from).collect()
    }

    pub fn operator_location(&self) -> Option<(f64, f64)> {
        match (self.operator_latitude, self.operator_longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    pub fn threat_limits(&self) -> ThreatLimits {
        let defaults = ThreatLimits::default();
        ThreatLimits {
            height_agl_limit_m: self.height_agl_limit_m.unwrap_or(defaults.height_agl_limit_m),
            speed_limit_mps: self.speed_limit_mps.unwrap_or(defaults.speed_limit_mps),
            operator_distance_limit_m: self.operator_distance_limit_m.unwrap_or(defaults.operator_distance_limit_m),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WifiConfig {
    /// Channel-plan mini-language expression (§4.8), e.g. `"2g:1-11"` or `"common"`.
    pub scan_channels: String,
    pub include_5ghz: bool,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            scan_channels: "2g:1-11".to_string(),
            include_5ghz: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BleConfig {
    pub scan_window_s: u64,
    pub min_backoff_s: u64,
    pub max_backoff_s: u64,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            scan_window_s: 5,
            min_backoff_s: 1,
            max_backoff_s: 30,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RemoteIdConfig {
    pub wifi: WifiConfig,
    pub ble: BleConfig,
}

/// Top-level configuration file, loaded from YAML via [`ridsentinel_common::ConfigEngine`].
#[into_configfile(version = 1, filename = "config.yaml")]
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RidsentinelConfig {
    pub acquisition: AcquisitionConfig,
    pub preprocessing: PreprocessingConfig,
    pub mqtt: MqttConfig,
    pub system: SystemConfig,
    pub data_fusion: DataFusionConfig,
    pub remote_id: RemoteIdConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_current_version() {
        let cfg = RidsentinelConfig::new();
        assert_eq!(CVERSION, cfg.version());
    }

    #[test]
    fn test_zone_config_converts_to_geofence_zone() {
        let zc = ZoneConfig { name: "restricted-a".into(), latitude: 12.3714, longitude: -1.5197, radius_km: 5.0 };
        let zone = GeofenceZone::from(&zc);
        assert!(zone.contains(12.3714, -1.5197));
    }

    #[test]
    fn test_data_fusion_threat_limits_fall_back_to_defaults() {
        let cfg = DataFusionConfig::default();
        let limits = cfg.threat_limits();
        assert_eq!(ThreatLimits::default().height_agl_limit_m, limits.height_agl_limit_m);
    }
}
