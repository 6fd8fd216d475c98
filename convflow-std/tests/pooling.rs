use convflow::sim::*;
use convflow::*;
use convflow_std::golden;
use convflow_std::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn pool(config: PoolingConfig, frames: &[Matrix<i64>], burps: (Burps, Burps)) -> Vec<Vec<i64>> {
    let pooling = Pooling::new(config).unwrap();
    let n_results = frames.len() * pooling.output_shape().n_pixels();

    let mut source = Source::new(burps.0);
    for frame in frames {
        source.push_frame(frame.iter().copied());
    }
    let mut bench = Testbench::new(source, pooling, Sink::new(burps.1));
    bench.run_until(|_, _, sink| sink.len() == n_results, 50_000).unwrap();
    bench.run(20);
    assert_eq!(bench.receiver().len(), n_results);
    bench.receiver().frames()
}

#[test]
fn matches_reference() {
    let mut rng = StdRng::seed_from_u64(11);
    let image_shape = ImageShape::new(6, 9);
    let frames = (0..2).map(|_| Matrix::from_fn(6, 9, |_, _| rng.gen_range(-128..=127))).collect::<Vec<_>>();

    for mode in [TreeOp::Max, TreeOp::Min, TreeOp::Sum] {
        let config = PoolingConfig { width: 8, image_shape, n: 3, mode };
        let results = pool(config, &frames, (Burps::random(0.3, 1), Burps::random(0.3, 2)));
        let expected = frames.iter().map(|frame| golden::pool(frame, 3, mode).into_vec()).collect::<Vec<_>>();
        assert_eq!(results, expected, "{:?}", mode);
    }
}

#[test]
fn two_by_two_max() {
    let image = Matrix::from_fn(4, 4, |y, x| (y * 4 + x) as i64);
    let config = PoolingConfig { width: 8, image_shape: ImageShape::new(4, 4), n: 2, mode: TreeOp::Max };
    assert_eq!(pool(config, &[image], (Burps::Never, Burps::Never)), vec![vec![5, 7, 13, 15]]);
}

#[test]
fn unit_window_passes_pixels() {
    let image = Matrix::from_fn(2, 3, |y, x| (x as i64) - (y as i64));
    let config = PoolingConfig { width: 4, image_shape: ImageShape::new(2, 3), n: 1, mode: TreeOp::Min };
    assert_eq!(pool(config, &[image.clone()], (Burps::Never, Burps::random(0.5, 3))), vec![image.into_vec()]);
}
