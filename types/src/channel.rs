//! The channel-hopping plan and its compact mini-language (§4.8, §6, Scenario F).
//!
//! Grammar:
//!
//! ```text
//! plan       := "all" | segment ("," segment)*
//! segment    := band ":" range-list | range-list
//! band       := "2g" | "5g"
//! range-list := range ("/" range)* | range ("-" range)
//! range      := number | number "-" number | "common"
//! ```
//!
//! A bare `range-list` with no band prefix is assumed to be 2.4 GHz, matching the
//! common shorthand `1,6,11`.

use eyre::{eyre, Result};

/// 5 GHz UNII channels `common` expands to.
const COMMON_5GHZ: &[u16] = &[36, 40, 44, 48, 149, 153, 157, 161];

/// One channel to dwell on: band-qualified channel number plus its center frequency.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanChannel {
    pub channel: u16,
    pub band_5ghz: bool,
    pub center_freq_hz: u64,
}

impl PlanChannel {
    fn new(channel: u16, band_5ghz: bool) -> Self {
        let center_freq_hz = if band_5ghz {
            (5_000 + 5 * channel) as u64 * 1_000_000
        } else {
            (2_412 + 5 * (channel - 1)) as u64 * 1_000_000
        };
        Self {
            channel,
            band_5ghz,
            center_freq_hz,
        }
    }
}

/// An ordered, deduplicated channel-hopping plan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelPlan {
    pub channels: Vec<PlanChannel>,
}

impl ChannelPlan {
    /// Parse a channel-plan expression (§4.8).
    pub fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();
        if expr.eq_ignore_ascii_case("all") {
            let mut channels: Vec<PlanChannel> = (1..=13).map(|c| PlanChannel::new(c, false)).collect();
            channels.extend(COMMON_5GHZ.iter().map(|&c| PlanChannel::new(c, true)));
            return Ok(Self { channels });
        }

        let mut channels = Vec::new();
        for segment in expr.split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (band_5ghz, rest) = match segment.split_once(':') {
                Some(("2g", rest)) => (false, rest),
                Some(("5g", rest)) => (true, rest),
                Some((other, _)) => return Err(eyre!("unknown channel-plan band prefix {other:?}")),
                None => (false, segment),
            };
            parse_range_list(rest, band_5ghz, &mut channels)?;
        }

        dedup(&mut channels);
        Ok(Self { channels })
    }

    pub fn frequencies_hz(&self) -> Vec<u64> {
        self.channels.iter().map(|c| c.center_freq_hz).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

fn parse_range_list(rest: &str, band_5ghz: bool, out: &mut Vec<PlanChannel>) -> Result<()> {
    for part in rest.split('/') {
        let part = part.trim();
        if part.eq_ignore_ascii_case("common") {
            for &c in COMMON_5GHZ {
                out.push(PlanChannel::new(c, band_5ghz));
            }
            continue;
        }
        if let Some((lo, hi)) = part.split_once('-') {
            let lo: u16 = lo.trim().parse().map_err(|_| eyre!("bad range start {lo:?}"))?;
            let hi: u16 = hi.trim().parse().map_err(|_| eyre!("bad range end {hi:?}"))?;
            if lo > hi {
                return Err(eyre!("inverted range {lo}-{hi}"));
            }
            for c in lo..=hi {
                out.push(PlanChannel::new(c, band_5ghz));
            }
        } else {
            let c: u16 = part.parse().map_err(|_| eyre!("bad channel number {part:?}"))?;
            out.push(PlanChannel::new(c, band_5ghz));
        }
    }
    Ok(())
}

fn dedup(channels: &mut Vec<PlanChannel>) {
    let mut seen = std::collections::HashSet::new();
    channels.retain(|c| seen.insert((c.channel, c.band_5ghz)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_scenario_f_channel_plan() {
        let plan = ChannelPlan::parse("2g:1-3,5g:36/40").unwrap();
        let freqs = plan.frequencies_hz();
        let expected = [2_412_000_000u64, 2_417_000_000, 2_422_000_000, 5_180_000_000, 5_200_000_000];
        assert_eq!(expected.to_vec(), freqs);
    }

    #[test]
    fn test_plain_2g_list() {
        let plan = ChannelPlan::parse("1,6,11").unwrap();
        assert_eq!(3, plan.len());
        assert!(plan.channels.iter().all(|c| !c.band_5ghz));
    }

    #[test]
    fn test_all_expands_2g_and_5g() {
        let plan = ChannelPlan::parse("all").unwrap();
        assert_eq!(13 + COMMON_5GHZ.len(), plan.len());
    }

    #[test]
    fn test_common_5g_shorthand() {
        let plan = ChannelPlan::parse("5g:common").unwrap();
        assert_eq!(COMMON_5GHZ.len(), plan.len());
    }

    #[test]
    fn test_unknown_band_prefix_errors() {
        assert!(ChannelPlan::parse("3g:1-3").is_err());
    }

    #[test]
    fn test_dedup_overlapping_ranges() {
        let plan = ChannelPlan::parse("1-3,2-4").unwrap();
        assert_eq!(4, plan.len());
    }

    #[rstest]
    #[case::scenario_f("2g:1-3,5g:36/40", 5)]
    #[case::plain_2g("1,6,11", 3)]
    #[case::all("all", 13 + COMMON_5GHZ.len())]
    #[case::common_5g("5g:common", COMMON_5GHZ.len())]
    #[case::overlapping_ranges("1-3,2-4", 4)]
    #[case::mixed_band_and_common("2g:1,5g:common", 1 + COMMON_5GHZ.len())]
    fn parse_yields_expected_channel_count(#[case] expr: &str, #[case] expected_len: usize) {
        let plan = ChannelPlan::parse(expr).unwrap();
        assert_eq!(expected_len, plan.len());
    }

    #[rstest]
    #[case::unknown_band("3g:1-3")]
    #[case::inverted_range("5-1")]
    #[case::non_numeric_channel("2g:abc")]
    fn parse_rejects_malformed_expressions(#[case] expr: &str) {
        assert!(ChannelPlan::parse(expr).is_err());
    }
}
