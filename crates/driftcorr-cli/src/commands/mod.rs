pub mod config;
pub mod correct;
pub mod estimate;
pub mod info;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use driftcorr_core::pipeline::config::{DriftConfig, PeakRefinement};

#[derive(Clone, Copy, ValueEnum)]
pub enum PeakRefinementArg {
    None,
    Parabolic,
    Upsampled,
}

impl From<PeakRefinementArg> for PeakRefinement {
    fn from(arg: PeakRefinementArg) -> Self {
        match arg {
            PeakRefinementArg::None => PeakRefinement::None,
            PeakRefinementArg::Parabolic => PeakRefinement::Parabolic,
            PeakRefinementArg::Upsampled => PeakRefinement::Upsampled,
        }
    }
}

/// Estimation options shared by `estimate` and `correct`. Flags override
/// values from `--config`.
#[derive(Args)]
pub struct DriftArgs {
    /// Drift config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Use every n-th frame for pairwise estimation
    #[arg(long)]
    pub stride: Option<usize>,

    /// First frame used for estimation
    #[arg(long)]
    pub start: Option<usize>,

    /// One past the last frame used for estimation
    #[arg(long)]
    pub stop: Option<usize>,

    /// Frames per side of a correlation block
    #[arg(long)]
    pub block_size: Option<usize>,

    /// Gaussian smoothing sigma before edge filtering
    #[arg(long)]
    pub sigma: Option<f32>,

    /// Half the side of the analysis window in pixels
    #[arg(long)]
    pub fftsize: Option<usize>,

    /// Largest shift searched for the correlation peak
    #[arg(long)]
    pub max_shift: Option<usize>,

    /// Analysis window center as "row,col"
    #[arg(long)]
    pub center: Option<String>,

    /// Explicit analysis window as "row0,row1,col0,col1" (overrides --center)
    #[arg(long)]
    pub extent: Option<String>,

    /// Discard pairs with a normalized weight below this
    #[arg(long)]
    pub min_weight: Option<f64>,

    /// Exponent applied to weights in the least-squares fit
    #[arg(long)]
    pub weight_power: Option<f64>,

    /// Sub-pixel peak refinement
    #[arg(long, value_enum)]
    pub peak_refinement: Option<PeakRefinementArg>,

    /// Grid density of the upsampled peak search (1/n pixel)
    #[arg(long)]
    pub upsample_factor: Option<usize>,

    /// Worker threads (default: one per core)
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,
}

impl DriftArgs {
    /// Load `--config` (or defaults) and apply flag overrides.
    pub fn resolve(&self) -> Result<DriftConfig> {
        let mut config: DriftConfig = if let Some(ref path) = self.config {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            toml::from_str(&contents).context("Invalid drift config")?
        } else {
            DriftConfig::default()
        };

        if let Some(v) = self.stride {
            config.stride = v;
        }
        if let Some(v) = self.start {
            config.start = v;
        }
        if self.stop.is_some() {
            config.stop = self.stop;
        }
        if let Some(v) = self.block_size {
            config.block_size = v;
        }
        if let Some(v) = self.sigma {
            config.sigma = v;
        }
        if let Some(v) = self.fftsize {
            config.fftsize = v;
        }
        if self.max_shift.is_some() {
            config.max_shift = self.max_shift;
        }
        if let Some(ref c) = self.center {
            let v = parse_indices(c, 2, "--center", "row,col")?;
            config.center = Some((v[0], v[1]));
        }
        if let Some(ref e) = self.extent {
            let v = parse_indices(e, 4, "--extent", "row0,row1,col0,col1")?;
            config.extent = Some((v[0], v[1], v[2], v[3]));
        }
        if let Some(v) = self.min_weight {
            config.min_normed_weight = v;
        }
        if let Some(v) = self.weight_power {
            config.weight_power = v;
        }
        if let Some(v) = self.peak_refinement {
            config.peak_refinement = v.into();
        }
        if let Some(v) = self.upsample_factor {
            config.upsample_factor = v;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_indices(s: &str, count: usize, flag: &str, form: &str) -> Result<Vec<usize>> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != count {
        bail!("{} expects \"{}\", got \"{}\"", flag, form, s);
    }
    parts
        .iter()
        .map(|p| {
            p.parse()
                .with_context(|| format!("Invalid {} value \"{}\"", flag, p))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_center() {
        assert_eq!(
            parse_indices("120, 64", 2, "--center", "row,col").unwrap(),
            vec![120, 64]
        );
        assert!(parse_indices("120", 2, "--center", "row,col").is_err());
        assert!(parse_indices("a,b", 2, "--center", "row,col").is_err());
    }

    #[test]
    fn test_parse_extent() {
        let v = parse_indices("0,64,10,74", 4, "--extent", "row0,row1,col0,col1").unwrap();
        assert_eq!(v, vec![0, 64, 10, 74]);
        assert!(parse_indices("0,64,10", 4, "--extent", "row0,row1,col0,col1").is_err());
    }
}
