//! Progressive scan descriptors and scan scripts.
//!
//! Progressive output here uses spectral selection only: one DC scan that
//! interleaves every component, followed by single-component AC scans,
//! each covering a band of zigzag indices. Each coefficient is coded in
//! exactly one scan at full precision.

use crate::consts::DCTSIZE2;
use crate::error::{Error, Result};
use crate::types::ScanScript;

/// Maximum number of components in a scan.
const MAX_COMPS_IN_SCAN: usize = 4;

/// Highest zigzag index an AC band may end at (inclusive)
const MAX_SE: u8 = (DCTSIZE2 - 1) as u8;

/// Describes a single scan in a progressive JPEG.
///
/// `ss` and `se` are inclusive, the way the SOS header carries them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanInfo {
    /// Number of components in this scan (1-4)
    pub comps_in_scan: u8,
    /// Component indices (up to 4)
    pub component_index: [u8; MAX_COMPS_IN_SCAN],
    /// Spectral selection start (0 for DC, 1-63 for AC)
    pub ss: u8,
    /// Spectral selection end (0 for DC, 1-63 for AC)
    pub se: u8,
}

impl ScanInfo {
    /// DC scan over the first `num_components` components, interleaved.
    pub fn dc_scan(num_components: u8) -> Self {
        Self {
            comps_in_scan: num_components.min(MAX_COMPS_IN_SCAN as u8),
            component_index: [0, 1, 2, 3],
            ss: 0,
            se: 0,
        }
    }

    /// AC band `ss..=se` of one component.
    pub fn ac_scan(component: u8, ss: u8, se: u8) -> Self {
        Self {
            comps_in_scan: 1,
            component_index: [component, 0, 0, 0],
            ss,
            se,
        }
    }

    /// One sequential scan with all coefficients of all components
    pub fn baseline(num_components: u8) -> Self {
        Self {
            se: MAX_SE,
            ..Self::dc_scan(num_components)
        }
    }

    /// Sequential scan of one component, all coefficients
    pub fn single_component(component: u8) -> Self {
        Self {
            se: MAX_SE,
            ..Self::ac_scan(component, 0, 0)
        }
    }

    /// Check if this is a DC-only scan.
    pub fn is_dc_scan(&self) -> bool {
        self.ss == 0 && self.se == 0
    }

    /// Components coded by this scan
    pub fn components(&self) -> &[u8] {
        &self.component_index[..self.comps_in_scan as usize]
    }

    /// Exclusive end of the zigzag range
    pub fn spectral_end(&self) -> usize {
        self.se as usize + 1
    }
}

/// DC scan, then one full AC scan (1-63) per component
pub fn generate_minimal_progressive_scans(num_components: u8) -> Vec<ScanInfo> {
    let mut scans = vec![ScanInfo::dc_scan(num_components)];
    for comp in 0..num_components {
        scans.push(ScanInfo::ac_scan(comp, 1, MAX_SE));
    }
    scans
}

/// DC scan, then AC bands 1-5 and 6-63 per component
pub fn generate_simple_progressive_scans(num_components: u8) -> Vec<ScanInfo> {
    let mut scans = vec![ScanInfo::dc_scan(num_components)];
    for comp in 0..num_components {
        scans.push(ScanInfo::ac_scan(comp, 1, 5));
        scans.push(ScanInfo::ac_scan(comp, 6, MAX_SE));
    }
    scans
}

/// Expand a [`ScanScript`] into scans, validated for `num_components`.
pub fn scans_for(script: &ScanScript, num_components: u8) -> Result<Vec<ScanInfo>> {
    let scans = match script {
        ScanScript::Minimal => generate_minimal_progressive_scans(num_components),
        ScanScript::Simple => generate_simple_progressive_scans(num_components),
        ScanScript::Custom(scans) => scans.clone(),
    };
    validate_scan_script(&scans, num_components)?;
    Ok(scans)
}

/// Check a script can be encoded: the first scan is the DC scan of every
/// component, and the AC scans cover indices 1-63 of every component
/// exactly once.
pub fn validate_scan_script(scans: &[ScanInfo], num_components: u8) -> Result<()> {
    let invalid = |msg: String| Err(Error::InvalidConfig(msg));

    let Some((first, rest)) = scans.split_first() else {
        return invalid("scan script is empty".into());
    };
    if *first != ScanInfo::dc_scan(num_components) {
        return invalid(format!(
            "first scan must be the DC scan of all {} components",
            num_components
        ));
    }

    let mut coded = vec![[false; DCTSIZE2]; num_components as usize];
    for (i, scan) in rest.iter().enumerate() {
        if scan.is_dc_scan() {
            return invalid(format!("scan {}: DC coded twice", i + 1));
        }
        if scan.comps_in_scan != 1 {
            return invalid(format!("scan {}: AC scans code a single component", i + 1));
        }
        if scan.ss == 0 || scan.ss > scan.se || scan.se > MAX_SE {
            return Err(Error::InvalidSpectralSelection {
                start: scan.ss as usize,
                end: scan.spectral_end(),
            });
        }
        let component = scan.component_index[0];
        let Some(seen) = coded.get_mut(component as usize) else {
            return invalid(format!("scan {}: no component {}", i + 1, component));
        };
        for k in scan.ss as usize..=scan.se as usize {
            if seen[k] {
                return invalid(format!(
                    "scan {}: coefficient {} of component {} coded twice",
                    i + 1,
                    k,
                    component
                ));
            }
            seen[k] = true;
        }
    }

    for (component, seen) in coded.iter().enumerate() {
        if let Some(k) = (1..DCTSIZE2).find(|&k| !seen[k]) {
            return invalid(format!(
                "coefficient {} of component {} is never coded",
                k, component
            ));
        }
    }
    Ok(())
}
