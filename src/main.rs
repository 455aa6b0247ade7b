//! Times each algorithm on the CPU device against a plain host reference.

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use workgroup_passes::{
    algorithms::{
        BitonicSorter, BlockReducer, MatrixTranspose, MaxPrefixSum, PrefixScanner, RadixSorter,
    },
    verify_sorted, CombineOp, ComputeConfig, ComputeDevice, CpuDevice, SortOrder,
};

#[derive(Parser)]
#[command(name = "passes-bench", about = "Benchmark multi-pass work-group algorithms")]
struct Cli {
    /// Number of input elements
    #[arg(short, long, global = true, default_value_t = 1 << 20)]
    n: usize,

    /// Timed repetitions per algorithm
    #[arg(short, long, global = true, default_value_t = 3)]
    iters: usize,

    /// Seed of the random input
    #[arg(long, global = true, default_value_t = 42)]
    seed: u64,

    /// Work-group width (overrides PASSES_WORK_GROUP_SIZE)
    #[arg(short, long, global = true)]
    work_group_size: Option<u32>,

    /// Transpose tile edge (overrides PASSES_TILE_SIZE)
    #[arg(long, global = true)]
    tile_size: Option<u32>,

    /// Bits per radix digit (overrides PASSES_RADIX_BITS)
    #[arg(long, global = true)]
    radix_bits: Option<u32>,

    /// Worker threads of the CPU device (overrides PASSES_THREADS)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Sum reduction
    Sum,
    /// Inclusive prefix sum
    Scan,
    /// Maximum running sum
    MaxPrefix,
    /// Bitonic sort of i32 values
    Bitonic {
        #[arg(long)]
        descending: bool,
    },
    /// Radix sort of u32 keys
    Radix,
    /// Square-ish matrix transpose
    Transpose,
    /// Everything above
    All,
}

impl Cli {
    fn config(&self) -> Result<ComputeConfig> {
        let mut config = ComputeConfig::from_env().context("reading PASSES_* environment")?;
        if let Some(size) = self.work_group_size {
            config = config.with_work_group_size(size);
        }
        if let Some(tile) = self.tile_size {
            config = config.with_tile_size(tile);
        }
        if let Some(bits) = self.radix_bits {
            config = config.with_radix_bits(bits);
        }
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        config.validate()?;
        Ok(config)
    }
}

struct Bench<'a> {
    device: &'a CpuDevice,
    config: &'a ComputeConfig,
    n: usize,
    iters: usize,
    rng: StdRng,
}

impl Bench<'_> {
    /// Runs `f` `iters` times and returns the last result with the best time
    fn time<R>(&self, mut f: impl FnMut() -> Result<R>) -> Result<(R, Duration)> {
        let mut best = Duration::MAX;
        let mut result = None;
        for _ in 0..self.iters.max(1) {
            let start = Instant::now();
            result = Some(f()?);
            best = best.min(start.elapsed());
        }
        let result = result.context("no iterations ran")?;
        Ok((result, best))
    }

    fn report(&self, name: &str, device: Duration, host: Duration) {
        println!(
            "{name:<12} n={:<10} device {:>10.3?}  host {:>10.3?}",
            self.n, device, host
        );
    }

    fn sum(&mut self) -> Result<()> {
        let data: Vec<u32> = (0..self.n).map(|_| self.rng.gen_range(0..1024)).collect();
        let input = self.device.to_device(&data)?;
        let reducer = BlockReducer::new(self.device, CombineOp::Sum, self.config)?;

        let (total, device) = self.time(|| Ok(reducer.reduce(&input)?))?;
        let start = Instant::now();
        let expected = data.iter().fold(0u32, |acc, v| acc.wrapping_add(*v));
        let host = start.elapsed();

        ensure!(total == expected, "sum {total} != host {expected}");
        self.report("sum", device, host);
        Ok(())
    }

    fn scan(&mut self) -> Result<()> {
        let data: Vec<i32> = (0..self.n).map(|_| self.rng.gen_range(-16..16)).collect();
        let input = self.device.to_device(&data)?;
        let scanner = PrefixScanner::new(self.device, self.config)?;

        let (prefix, device) = self.time(|| {
            let output = scanner.scan(&input)?;
            Ok(self.device.to_host(&output.prefix)?)
        })?;
        let start = Instant::now();
        let expected: Vec<i32> = data
            .iter()
            .scan(0i32, |acc, v| {
                *acc = acc.wrapping_add(*v);
                Some(*acc)
            })
            .collect();
        let host = start.elapsed();

        ensure!(prefix == expected, "scan differs from host reference");
        self.report("scan", device, host);
        Ok(())
    }

    fn max_prefix(&mut self) -> Result<()> {
        let data: Vec<i32> = (0..self.n).map(|_| self.rng.gen_range(-100..=100)).collect();
        let input = self.device.to_device(&data)?;
        let pipeline = MaxPrefixSum::new(self.device, self.config)?;

        let (best, device) = self.time(|| Ok(pipeline.run(&input)?))?;
        let start = Instant::now();
        let mut sum = 0i32;
        let mut expected = 0;
        for v in &data {
            sum = sum.wrapping_add(*v);
            expected = expected.max(sum);
        }
        let host = start.elapsed();

        ensure!(best == expected, "max prefix {best} != host {expected}");
        self.report("max-prefix", device, host);
        Ok(())
    }

    fn bitonic(&mut self, order: SortOrder) -> Result<()> {
        let data: Vec<i32> = (0..self.n).map(|_| self.rng.gen()).collect();
        let sorter = BitonicSorter::new(self.device, self.config)?;

        let (sorted, device) = self.time(|| {
            let mut copy = data.clone();
            sorter.sort(&mut copy, order)?;
            Ok(copy)
        })?;
        let start = Instant::now();
        let mut expected = data.clone();
        match order {
            SortOrder::Ascending => expected.sort_unstable(),
            SortOrder::Descending => expected.sort_unstable_by(|a, b| b.cmp(a)),
        }
        let host = start.elapsed();

        ensure!(verify_sorted(&sorted, order), "bitonic output is not {order}");
        ensure!(sorted == expected, "bitonic output differs from host sort");
        self.report("bitonic", device, host);
        Ok(())
    }

    fn radix(&mut self) -> Result<()> {
        let data: Vec<u32> = (0..self.n).map(|_| self.rng.gen()).collect();
        let sorter = RadixSorter::new(self.device, self.config)?;

        let ((sorted, passes), device) = self.time(|| {
            let mut copy = data.clone();
            let passes = sorter.sort(&mut copy)?;
            Ok((copy, passes))
        })?;
        let start = Instant::now();
        let mut expected = data.clone();
        expected.sort_unstable();
        let host = start.elapsed();

        ensure!(sorted == expected, "radix output differs from host sort");
        tracing::info!(passes, "radix digit passes");
        self.report("radix", device, host);
        Ok(())
    }

    fn transpose(&mut self) -> Result<()> {
        let rows = (self.n as f64).sqrt() as usize;
        let cols = self.n.checked_div(rows).unwrap_or(0);
        let data: Vec<f32> = (0..rows * cols).map(|_| self.rng.gen()).collect();
        let input = self.device.to_device(&data)?;
        let op = MatrixTranspose::new(self.device, self.config)?;

        let (output, device) = self.time(|| {
            let transposed = op.transpose(&input, rows, cols)?;
            Ok(self.device.to_host(&transposed)?)
        })?;
        let start = Instant::now();
        let mut expected = vec![0f32; rows * cols];
        for r in 0..rows {
            for c in 0..cols {
                expected[c * rows + r] = data[r * cols + c];
            }
        }
        let host = start.elapsed();

        ensure!(output == expected, "transpose differs from host reference");
        self.report("transpose", device, host);
        Ok(())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = cli.config()?;
    let device = CpuDevice::new(&config)?.with_launch_log(false);
    tracing::info!(backend = %device.backend_info(), ?config, "starting");

    let mut bench = Bench {
        device: &device,
        config: &config,
        n: cli.n,
        iters: cli.iters,
        rng: StdRng::seed_from_u64(cli.seed),
    };

    match cli.command.unwrap_or(Commands::All) {
        Commands::Sum => bench.sum()?,
        Commands::Scan => bench.scan()?,
        Commands::MaxPrefix => bench.max_prefix()?,
        Commands::Bitonic { descending } => bench.bitonic(if descending {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        })?,
        Commands::Radix => bench.radix()?,
        Commands::Transpose => bench.transpose()?,
        Commands::All => {
            bench.sum()?;
            bench.scan()?;
            bench.max_prefix()?;
            bench.bitonic(SortOrder::Ascending)?;
            bench.radix()?;
            bench.transpose()?;
        }
    }

    tracing::info!(launches = device.launch_count(), "done");
    Ok(())
}
