//! Callee-save table dump binary.
//!
//! Prints the canonical register placement tables of a target so they can
//! be diffed across builds and platforms.

use clap::{Parser, ValueEnum};
use irframe::core::{OffsetBase, RegisterAtOffsetList, RegisterCatalog, Target, Tier};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TargetArg {
    #[value(name = "x86-64")]
    X86_64,
    Aarch64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TierArg {
    Baseline,
    Optimizing,
    Both,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BaseArg {
    /// Offsets below the frame pointer.
    Fp,
    /// Offsets from the start of the save area.
    Zero,
}

#[derive(Debug, Parser)]
#[command(name = "irframe-dump", about = "Dump canonical callee-save tables")]
struct Args {
    /// Target whose tables to print (defaults to the host).
    #[arg(long, value_enum)]
    target: Option<TargetArg>,

    #[arg(long, value_enum, default_value = "both")]
    tier: TierArg,

    #[arg(long, value_enum, default_value = "fp")]
    base: BaseArg,

    /// Shift every offset by this many bytes before printing.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    adjust: i32,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let target = match args.target {
        Some(TargetArg::X86_64) => Target::X86_64,
        Some(TargetArg::Aarch64) => Target::Aarch64,
        None => Target::host(),
    };
    let tiers: &[Tier] = match args.tier {
        TierArg::Baseline => &[Tier::Baseline],
        TierArg::Optimizing => &[Tier::Optimizing],
        TierArg::Both => &[Tier::Baseline, Tier::Optimizing],
    };

    let catalog = RegisterCatalog::for_target(target);
    log::info!("Dumping {} tables", catalog.convention().name);

    for &tier in tiers {
        let canonical = catalog.callee_saves(tier);
        let mut table = match args.base {
            BaseArg::Fp => canonical.clone(),
            BaseArg::Zero => RegisterAtOffsetList::new(&canonical.registers(), OffsetBase::ZeroBased),
        };
        if args.adjust != 0 {
            table.adjust_offsets(args.adjust);
        }
        print_table(catalog, tier, &table);
    }
}

fn print_table(catalog: &RegisterCatalog, tier: Tier, table: &RegisterAtOffsetList) {
    println!(
        "{} {}: {} registers, {} bytes",
        catalog.convention().name,
        tier,
        table.register_count(),
        table.size_of_area_in_bytes()
    );
    for entry in table {
        println!(
            "  {:<6} {:>5} {}",
            catalog.register_name(entry.reg()),
            entry.offset(),
            entry.width()
        );
    }
}
