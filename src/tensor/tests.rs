use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;

#[test]
fn test_new_and_from_vec() {
    let t = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[2, 3]);
    assert_eq!(t.shape(), &[2, 3]);
    assert_eq!(t.size(), 6);
    assert_eq!(t.batch_size(), 2);

    let err = Tensor::from_vec(vec![1., 2., 3.], &[2, 2]).unwrap_err();
    assert_eq!(
        err,
        TensorError::DataLengthMismatch {
            len: 3,
            shape: vec![2, 2]
        }
    );
}

#[test]
#[should_panic]
fn test_new_with_wrong_length_panics() {
    Tensor::new(&[1., 2., 3.], &[2, 2]);
}

#[test]
fn test_seeded_random_is_reproducible() {
    let mut rng_1 = StdRng::seed_from_u64(7);
    let mut rng_2 = StdRng::seed_from_u64(7);
    let a = Tensor::uniform(0., 1., &[4, 4], &mut rng_1);
    let b = Tensor::uniform(0., 1., &[4, 4], &mut rng_2);
    assert_eq!(a, b);
    assert!(a.to_vec().iter().all(|&x| (0.0..1.0).contains(&x)));

    let n = Tensor::normal(0., 0.02, &[64, 64], &mut rng_1);
    assert!(n.is_finite());
    assert!(n.mean().abs() < 0.01);
    assert!((n.std_dev() - 0.02).abs() < 0.005);
}

#[test]
fn test_arithmetic_and_broadcast() {
    let a = Tensor::new(&[1., 2., 3., 4.], &[2, 2]);
    let b = Tensor::new(&[10., 20.], &[1, 2]);
    assert_eq!(&a + &b, Tensor::new(&[11., 22., 13., 24.], &[2, 2]));
    assert_eq!(&a - 1.0, Tensor::new(&[0., 1., 2., 3.], &[2, 2]));
    assert_eq!(2.0 * &a, Tensor::new(&[2., 4., 6., 8.], &[2, 2]));
    assert_eq!(-&a, Tensor::new(&[-1., -2., -3., -4.], &[2, 2]));

    let mut c = a.clone();
    c += &a;
    c *= 0.5;
    assert_eq!(c, a);
}

#[test]
#[should_panic]
fn test_incompatible_shapes_panic() {
    let a = Tensor::zeros(&[2, 3]);
    let b = Tensor::zeros(&[2, 2]);
    let _ = &a + &b;
}

#[test]
fn test_zip_map_reports_shape_mismatch() {
    let a = Tensor::zeros(&[2, 3]);
    let b = Tensor::zeros(&[3, 2]);
    let err = a.zip_map(&b, Operator::Sub, |x, y| x - y).unwrap_err();
    assert!(matches!(
        err,
        TensorError::OperatorError {
            operator: Operator::Sub,
            ..
        }
    ));
}

#[test]
fn test_statistics() {
    let t = Tensor::new(&[1., 2., 3., 4.], &[4]);
    assert_abs_diff_eq!(t.sum(), 10.0);
    assert_abs_diff_eq!(t.mean(), 2.5);
    assert_abs_diff_eq!(t.variance(), 1.25);
    assert_abs_diff_eq!(t.sum_squares(), 30.0);
    assert_abs_diff_eq!(t.max_abs(), 4.0);
    assert_abs_diff_eq!(t.dot_sum(&t).unwrap(), 30.0);
    assert!(!Tensor::new(&[1., f32::NAN], &[2]).is_finite());
    assert!(!Tensor::new(&[f32::INFINITY], &[1]).is_finite());
}

#[test]
fn test_per_sample_operations() {
    let t = Tensor::new(&[3., 4., 0., 1.], &[2, 1, 2]);
    assert_eq!(t.per_sample_l2_norm(), vec![5.0, 1.0]);

    let scaled = t.scale_per_sample(&[2.0, -1.0]).unwrap();
    assert_eq!(scaled, Tensor::new(&[6., 8., -0., -1.], &[2, 1, 2]));
    assert!(t.scale_per_sample(&[1.0]).is_err());

    let second = t.sample(1).unwrap();
    assert_eq!(second, Tensor::new(&[0., 1.], &[1, 1, 2]));
    assert!(t.sample(2).is_err());

    let stacked = Tensor::stack(&[t.clone(), t.clone()]).unwrap();
    assert_eq!(stacked.shape(), &[2, 2, 1, 2]);
    assert_eq!(Tensor::stack(&[]).unwrap_err(), TensorError::EmptyList);
}

#[test]
fn test_image_conversion() {
    let mut image = image::RgbImage::new(2, 1);
    image.put_pixel(0, 0, image::Rgb([0, 255, 128]));
    image.put_pixel(1, 0, image::Rgb([255, 0, 0]));

    let t = Tensor::from_rgb_image(&image);
    assert_eq!(t.shape(), &[1, 2, 3]);
    assert_abs_diff_eq!(t.to_vec()[0], -1.0);
    assert_abs_diff_eq!(t.to_vec()[1], 1.0);

    let back = t.to_rgb_image().unwrap();
    assert_eq!(back, image);

    // 带批维度也可转换，超出值域会被截断
    let batch = Tensor::new(&[2.0, -3.0, 0.0], &[1, 1, 1, 3]);
    let pixel = *batch.to_rgb_image().unwrap().get_pixel(0, 0);
    assert_eq!(pixel, image::Rgb([255, 0, 128]));

    let gray = image::GrayImage::from_raw(1, 1, vec![255]).unwrap();
    assert_eq!(Tensor::from_gray_image(&gray), Tensor::ones(&[1, 1, 3]));

    assert!(Tensor::zeros(&[2, 2]).to_rgb_image().is_err());
}
