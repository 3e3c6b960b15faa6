use std::path::Path;

use console::Style;
use driftcorr_core::frame::FrameStack;
use driftcorr_core::pipeline::config::{DriftConfig, PeakRefinement};
use driftcorr_core::pipeline::DriftEstimate;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    warn: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            warn: Style::new().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_run_summary(config: &DriftConfig, input: &Path, stack: &FrameStack, threads: usize) {
    let s = Styles::new();
    let (h, w) = stack.dim();
    let sampled = config.sampled_indices(stack.len()).len();

    println!();
    println!("  {}", s.title.apply_to("Drift Correction"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(16)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(input.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(format!("{} ({}x{})", stack.len(), w, h))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Threads"),
        s.value.apply_to(threads)
    );
    println!();

    println!("  {}", s.header.apply_to("Sampling"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Stride"),
        s.value.apply_to(config.stride)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Sampled"),
        s.value.apply_to(format!("{} frames", sampled))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Block"),
        s.value.apply_to(format!("{0}x{0} pairs", config.block_size))
    );
    println!();

    println!("  {}", s.header.apply_to("Correlation"));
    let window = match config.extent {
        Some((r0, r1, c0, c1)) => format!("rows {}..{}, cols {}..{}", r0, r1, c0, c1),
        None => {
            let center = config.center.unwrap_or((h / 2, w / 2));
            format!(
                "{0}x{0} px at ({1}, {2})",
                2 * config.fftsize,
                center.0,
                center.1
            )
        }
    };
    println!(
        "    {:<12}{}",
        s.label.apply_to("Window"),
        s.value.apply_to(window)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Max shift"),
        s.value.apply_to(format!("{} px", config.window()))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Sigma"),
        s.value.apply_to(config.sigma)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Peak"),
        s.method.apply_to(match config.peak_refinement {
            PeakRefinement::Upsampled => {
                format!("{} (1/{} px)", config.peak_refinement, config.upsample_factor)
            }
            other => other.to_string(),
        })
    );
    println!();

    println!("  {}", s.header.apply_to("Solver"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Min weight"),
        s.value.apply_to(config.min_normed_weight)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Power"),
        s.value.apply_to(config.weight_power)
    );
    println!();
}

pub fn print_estimate_summary(estimate: &DriftEstimate) {
    let s = Styles::new();
    let sampled = estimate.half.len();
    let surviving = estimate.masked.len();

    println!();
    println!("  {}", s.header.apply_to("Result"));
    let frames_style = if surviving < sampled { &s.warn } else { &s.value };
    println!(
        "    {:<12}{}",
        s.label.apply_to("Surviving"),
        frames_style.apply_to(format!("{}/{} frames", surviving, sampled))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Pairs"),
        s.value.apply_to(estimate.masked.surviving_pairs())
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Residual"),
        s.value.apply_to(format!(
            "dy {:.3} px, dx {:.3} px",
            estimate.trajectory.residual_dy, estimate.trajectory.residual_dx
        ))
    );

    let (min_y, max_y, min_x, max_x) = estimate.shifts.shifts.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(a, b, c, d), sh| (a.min(sh.dy), b.max(sh.dy), c.min(sh.dx), d.max(sh.dx)),
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Drift dy"),
        s.value.apply_to(format!("{:.2} .. {:.2} px", min_y, max_y))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Drift dx"),
        s.value.apply_to(format!("{:.2} .. {:.2} px", min_x, max_x))
    );
    println!();
}
