//! dosemux: multiplex exposure masks in resin print files.

mod synthetic;

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use dosemux_compose::{any_overlap, partition, OptimizationSummary, OptimizerConfig, PartitionConfig};
use dosemux_core::config::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};
use dosemux_core::{CanvasConfig, Mask, MaskId, MaskTable};
use dosemux_printfile::{
    find_overlapping_placements, generate_print_file, load_layout, load_print_file,
    optimize_print_file, DoseMode, LayoutConfig,
};

use crate::synthetic::SyntheticGenerator;

#[derive(Parser)]
#[command(name = "dosemux")]
#[command(about = "Combine non-overlapping exposure masks into fewer printer passes")]
#[command(version)]
struct Cli {
    /// Plate width in pixels
    #[arg(long, global = true, default_value_t = DEFAULT_CANVAS_WIDTH)]
    width: u32,

    /// Plate height in pixels
    #[arg(long, global = true, default_value_t = DEFAULT_CANVAS_HEIGHT)]
    height: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a print file by composing non-overlapping masks
    Optimize {
        /// Input print file (.zip)
        input: PathBuf,

        /// Output file (defaults to <stem>_optimized.zip)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Process layers one at a time instead of in parallel
        #[arg(long)]
        sequential: bool,

        /// Tag inserted into composite mask names
        #[arg(long, default_value = "opt")]
        tag: String,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stamp a component print file onto a plate layout
    Generate {
        /// Component print file (.zip)
        input: PathBuf,

        /// Layout JSON: [{"group": "50", "x": 0, "y": 0, "width": 100, "height": 100}, ...]
        #[arg(short, long)]
        layout: PathBuf,

        /// How group labels become exposure durations
        #[arg(short, long, value_enum, default_value = "percentage")]
        mode: ModeArg,

        /// Optimize the generated file
        #[arg(long)]
        optimize: bool,

        /// Output file (.zip)
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Partition each layer's masks into non-overlapping groups
    Partition {
        /// Input print file (.zip)
        input: PathBuf,

        /// Only partition this layer (0-based)
        #[arg(short, long)]
        layer: Option<usize>,

        /// Spatial grid cells per axis
        #[arg(short, long, default_value = "10")]
        grid_size: u32,

        /// Print groups as JSON
        #[arg(long)]
        json: bool,
    },

    /// Partition randomly generated masks and verify the result
    Synthetic {
        /// Number of masks
        #[arg(short, long, default_value = "30")]
        count: usize,

        /// Random seed for reproducibility
        #[arg(short, long, default_value = "42")]
        seed: u64,

        /// Spatial grid cells per axis
        #[arg(short, long, default_value = "10")]
        grid_size: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    /// Group label is the exposure in milliseconds
    Absolute,
    /// Group label is a percentage of the original exposure
    Percentage,
}

impl From<ModeArg> for DoseMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Absolute => DoseMode::Absolute,
            ModeArg::Percentage => DoseMode::Percentage,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let canvas = CanvasConfig::new(cli.width, cli.height);
    canvas.validate()?;

    match cli.command {
        Commands::Optimize {
            input,
            output,
            sequential,
            tag,
            json,
        } => {
            let config = OptimizerConfig::new()
                .with_canvas(canvas)
                .with_composite_tag(tag)
                .with_parallel(!sequential);
            let result = optimize_print_file(&input, output.as_deref(), &config)
                .with_context(|| format!("failed to optimize {}", input.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result.summary)?);
            } else {
                print_summary(&result.summary);
                println!("\nWritten to {}", result.output.display());
            }
        }

        Commands::Generate {
            input,
            layout,
            mode,
            optimize,
            output,
        } => {
            let placements = load_layout(&layout)
                .with_context(|| format!("failed to read layout {}", layout.display()))?;
            for (a, b) in find_overlapping_placements(&placements) {
                log::warn!("Components {a} and {b} overlap on the plate");
            }

            let config = LayoutConfig::new()
                .with_canvas(canvas)
                .with_mode(mode.into())
                .with_optimize(optimize);
            let generated = generate_print_file(&input, &output, &placements, &config)
                .with_context(|| format!("failed to generate from {}", input.display()))?;

            println!(
                "Generated {} layers, {} entries, {} masks",
                generated.job.layer_count(),
                generated.job.entry_count(),
                generated.masks.len()
            );
            if let Some(summary) = &generated.optimization {
                println!();
                print_summary(summary);
            }
            println!("\nWritten to {}", output.display());
        }

        Commands::Partition {
            input,
            layer,
            grid_size,
            json,
        } => {
            let file = load_print_file(&input)
                .with_context(|| format!("failed to load {}", input.display()))?;
            let config = PartitionConfig::new().with_grid_size(grid_size);

            let selected: Vec<usize> = match layer {
                Some(index) if index >= file.job.layer_count() => bail!(
                    "layer {index} out of range ({} layers)",
                    file.job.layer_count()
                ),
                Some(index) => vec![index],
                None => (0..file.job.layer_count()).collect(),
            };

            let mut report: BTreeMap<usize, BTreeMap<usize, Vec<MaskId>>> = BTreeMap::new();
            for index in selected {
                let masks: MaskTable = file.job.layers[index]
                    .entries
                    .iter()
                    .filter_map(|e| Some((e.mask.clone(), file.masks.get(&e.mask)?.clone())))
                    .collect();
                let result = partition(&masks, &config)?;

                if !json {
                    println!(
                        "Layer {}: {} masks in {} groups ({} conflicts)",
                        index,
                        result.mask_count(),
                        result.group_count(),
                        result.graph.edge_count()
                    );
                    for (group, members) in &result.groups {
                        println!("  Group {}: {}", group, members.join(", "));
                    }
                }
                report.insert(index, result.groups);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }

        Commands::Synthetic {
            count,
            seed,
            grid_size,
        } => {
            let masks = SyntheticGenerator::with_seed(seed).masks(count, &canvas)?;
            let config = PartitionConfig::new().with_grid_size(grid_size);
            let result = partition(&masks, &config)?;

            println!("Synthetic Partition");
            println!("===================");
            println!("Masks:          {}", result.mask_count());
            println!("Conflicts:      {}", result.graph.edge_count());
            println!("Pairs checked:  {}", result.pairs_checked);
            println!("Groups:         {}", result.group_count());

            for (group, members) in &result.groups {
                let refs: Vec<&Mask> = members.iter().filter_map(|m| masks.get(m)).collect();
                if any_overlap(&refs) {
                    bail!("group {group} contains overlapping masks");
                }
                println!("  Group {}: {} masks", group, members.len());
            }
            println!("\nAll groups verified non-overlapping");
        }
    }

    Ok(())
}

fn print_summary(summary: &OptimizationSummary) {
    println!("Optimization Summary");
    println!("====================");
    println!(
        "Layers:      {} total, {} optimized, {} skipped",
        summary.layers_total, summary.layers_optimized, summary.layers_skipped
    );
    println!(
        "Entries:     {} -> {} ({:.1}% fewer passes)",
        summary.entries_before,
        summary.entries_after,
        summary.reduction() * 100.0
    );
    println!("Composites:  {}", summary.composites_created);
    println!(
        "Groups:      {} composed, {} left alone (overlapping)",
        summary.groups_composed, summary.groups_overlapping
    );
    println!("Time:        {} ms", summary.computation_time_ms);
}
