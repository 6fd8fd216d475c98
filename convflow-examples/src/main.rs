//! Streams random frames through a stage and checks the results against the reference models.
//!
//! ```text
//! USAGE:
//!   convflow-examples conv [OPTIONS]    Convolve random frames
//!   convflow-examples pool [OPTIONS]    Pool random frames
//! ```
//!
//! Set `RUST_LOG=debug` to see the elaborated configurations.

use anyhow::{ensure, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use convflow::sim::*;
use convflow::*;
use convflow_std::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "convflow-examples", about = "Streaming convolution demos", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Args)]
struct Stream {
    /// Image height.
    #[arg(long, default_value_t = 8)]
    height: usize,
    /// Image width.
    #[arg(long, default_value_t = 8)]
    width: usize,
    /// Pixel and coefficient width in bits.
    #[arg(long, default_value_t = 8)]
    data_width: u32,
    /// Number of frames.
    #[arg(long, default_value_t = 2)]
    frames: usize,
    /// Stall probability of the producer and of the consumer.
    #[arg(long, default_value_t = 0.0)]
    burps: f64,
    /// Random seed.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Print the settled ports of this many leading cycles.
    #[arg(long, default_value_t = 0)]
    trace: u64,
}

impl Stream {
    fn check(&self) -> Result<()> {
        ensure!((0.0..1.0).contains(&self.burps), "stall probability {} is outside [0, 1)", self.burps);
        Ok(())
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Convolve random frames with a random kernel.
    Conv {
        #[command(flatten)]
        stream: Stream,
        /// Kernel size.
        #[arg(short, default_value_t = 3)]
        n: usize,
        /// Number of dot-product cores.
        #[arg(long, default_value_t = 1)]
        cores: usize,
        /// Rotate the kernel, i.e. convolve instead of correlate.
        #[arg(long)]
        invert: bool,
    },
    /// Pool random frames.
    Pool {
        #[command(flatten)]
        stream: Stream,
        /// Window size.
        #[arg(short, default_value_t = 2)]
        n: usize,
        /// Reduction.
        #[arg(long, value_enum, default_value_t = Mode::Max)]
        mode: Mode,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Max,
    Min,
    Sum,
}

impl From<Mode> for TreeOp {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Max => TreeOp::Max,
            Mode::Min => TreeOp::Min,
            Mode::Sum => TreeOp::Sum,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into())).init();

    run(Cli::parse())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Cmd::Conv { stream, n, cores, invert } => cmd_conv(&stream, n, cores, invert)?,
        Cmd::Pool { stream, n, mode } => cmd_pool(&stream, n, mode.into())?,
    }

    Ok(())
}

fn cmd_conv(stream: &Stream, n: usize, n_cores: usize, invert: bool) -> Result<()> {
    stream.check()?;
    let config = ConvolutionConfig { invert, ..ConvolutionConfig::new(stream.data_width, stream.width, n, n_cores) };
    let conv = Convolution::new(config)?;
    ensure!(stream.height >= n, "image height {} is shorter than the kernel size {}", stream.height, n);
    for warning in conv.warnings() {
        println!("warning: {}", warning);
    }

    let mut rng = StdRng::seed_from_u64(stream.seed);
    let kernel = random_matrix(&mut rng, n, n, stream.data_width);
    let frames = random_frames(&mut rng, stream);
    let expected = frames
        .iter()
        .map(|frame| {
            let reference = if invert { golden::convolve_valid(frame, &kernel) } else { golden::correlate_valid(frame, &kernel) };
            reference.into_vec()
        })
        .collect::<Vec<_>>();

    info!(output_width = conv.output_width(), n_cores, "convolution");
    let results = simulate((source(&frames, stream), Constant::new(kernel)), conv, stream, &expected)?;
    println!("convolution {}x{} over {} cores: {}", n, n, n_cores, results);
    Ok(())
}

fn cmd_pool(stream: &Stream, n: usize, mode: TreeOp) -> Result<()> {
    stream.check()?;
    let image_shape = ImageShape::new(stream.height, stream.width);
    let pooling = Pooling::new(PoolingConfig { width: stream.data_width, image_shape, n, mode })?;

    let mut rng = StdRng::seed_from_u64(stream.seed);
    let frames = random_frames(&mut rng, stream);
    let expected = frames.iter().map(|frame| golden::pool(frame, n, mode).into_vec()).collect::<Vec<_>>();

    info!(output_shape = ?pooling.output_shape(), output_width = pooling.output_width(), "pooling");
    let results = simulate(source(&frames, stream), pooling, stream, &expected)?;
    println!("{:?} pooling {}x{}: {}", mode, n, n, results);
    Ok(())
}

/// Cycle count of a checked run.
struct Report {
    frames: usize,
    results: usize,
    cycles: u64,
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} frames, {} results in {} cycles", self.frames, self.results, self.cycles)?;
        if self.results > 0 {
            write!(f, " ({:.2} cycles per result)", self.cycles as f64 / self.results as f64)?;
        }
        Ok(())
    }
}

fn simulate<D, M>(driver: D, dut: M, stream: &Stream, expected: &[Vec<i64>]) -> Result<Report>
where
    D: Driver,
    M: Module<I = D::I, O = AxisChannel<i64>>,
{
    let n_results = expected.iter().map(Vec::len).sum::<usize>();
    let mut bench = Testbench::new(driver, dut, Sink::new(burps(stream.burps, stream.seed.wrapping_add(1))));

    for _ in 0..stream.trace {
        for (name, value) in bench.ports() {
            println!("{:>6} {:<24} {}", bench.cycle(), name, value);
        }
        bench.tick();
    }
    let _ = bench.run_until(|_, _, sink| sink.len() >= n_results, 1_000_000)?;

    let results = bench.receiver().frames();
    ensure!(results == expected, "results differ from the reference model");
    Ok(Report { frames: results.len(), results: n_results, cycles: bench.cycle() })
}

fn burps(probability: f64, seed: u64) -> Burps {
    if probability > 0.0 {
        Burps::random(probability, seed)
    } else {
        Burps::Never
    }
}

fn source(frames: &[Matrix<i64>], stream: &Stream) -> Source<i64> {
    let mut source = Source::new(burps(stream.burps, stream.seed.wrapping_add(2)));
    for frame in frames {
        source.push_frame(frame.iter().copied());
    }
    source
}

fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize, width: u32) -> Matrix<i64> {
    let (min, max) = (min_signed(width) as i64, max_signed(width) as i64);
    Matrix::from_fn(rows, cols, |_, _| rng.gen_range(min..=max))
}

fn random_frames(rng: &mut StdRng, stream: &Stream) -> Vec<Matrix<i64>> {
    (0..stream.frames).map(|_| random_matrix(rng, stream.height, stream.width, stream.data_width)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(args: &[&str]) -> Result<()> { run(Cli::try_parse_from(args.iter().copied())?) }

    #[test]
    fn stall_probability_out_of_range() {
        for burps in ["1.0", "1.5", "-0.1"] {
            let burps = format!("--burps={}", burps);
            let err = run_args(&["convflow-examples", "conv", &burps]).unwrap_err();
            assert!(err.to_string().contains("stall probability"), "{}", err);
        }
    }

    #[test]
    fn small_runs_match_the_reference() {
        run_args(&["convflow-examples", "conv", "--height", "5", "--width", "5", "--cores", "2", "--burps", "0.5"]).unwrap();
        run_args(&["convflow-examples", "pool", "--height", "4", "--width", "6", "--mode", "sum"]).unwrap();
    }
}
