use super::numeric_grad;
use crate::nn::{
    ConvFeatureExtractor, Discriminator, FeatureExtractor, Generator, Gradients, Module,
    NetworkTrace, PatchDiscriminator, StyleGenerator,
};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn test_style_generator_shapes() {
    let mut rng = StdRng::seed_from_u64(0);
    let generator = StyleGenerator::new(3, 4, &mut rng);
    let photo = Tensor::uniform(-1.0, 1.0, &[2, 8, 6, 3], &mut rng);
    let fake = generator.generate(&photo).unwrap();
    assert_eq!(fake.shape(), photo.shape());
    assert!(fake.max_abs() <= 1.0);
    assert!(generator.num_params() > 0);
    assert!(generator.parameters().iter().all(|p| p.name().starts_with("generator.")));

    // 高或宽为奇数时报错
    assert!(generator.generate(&Tensor::zeros(&[1, 7, 8, 3])).is_err());
    assert!(generator.forward_trace(&Tensor::zeros(&[1, 8, 8])).is_err());
}

#[test]
fn test_same_seed_builds_same_networks() {
    let g1 = StyleGenerator::new(3, 4, &mut StdRng::seed_from_u64(9));
    let g2 = StyleGenerator::new(3, 4, &mut StdRng::seed_from_u64(9));
    assert_eq!(g1.state_dict(), g2.state_dict());
}

#[test]
fn test_generator_backward_matches_finite_difference() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut generator = StyleGenerator::new(3, 2, &mut rng);
    // 放大初始权重，使数值梯度远离舍入误差
    for p in generator.parameters_mut() {
        let scaled = p.value() * 20.0;
        p.set_value(scaled).unwrap();
    }
    let photo = Tensor::uniform(-1.0, 1.0, &[1, 4, 4, 3], &mut rng);
    let trace = generator.forward_trace(&photo).unwrap();
    let r = Tensor::uniform(-1.0, 1.0, trace.output().shape(), &mut rng);
    let mut grads = Gradients::new();
    generator.backward(&trace, &r, &mut grads).unwrap();
    assert_eq!(grads.len(), generator.parameters().len());

    let name = "generator.out.weight";
    let state = generator.state_dict();
    let loss = |w: &Tensor| {
        let mut g = generator.clone();
        let mut s = state.clone();
        s.insert(name.to_string(), w.clone());
        g.load_state_dict(&s).unwrap();
        g.generate(&photo).unwrap().dot_sum(&r).unwrap()
    };
    assert_abs_diff_eq!(
        grads.get(name).unwrap(),
        &numeric_grad(loss, &state[name], 1e-2),
        epsilon = 1e-2
    );
}

#[test]
fn test_patch_discriminator_outputs() {
    let mut rng = StdRng::seed_from_u64(1);
    let discriminator = PatchDiscriminator::new(3, 8, &mut rng);
    let image = Tensor::uniform(-1.0, 1.0, &[2, 8, 8, 3], &mut rng);
    let output = discriminator.discriminate(&image).unwrap();
    assert_eq!(output.logit.shape(), &[2, 4, 4, 1]);
    assert_eq!(output.features.shape(), &[2, 4, 4, 8]);

    let trace = discriminator.forward_trace(&image).unwrap();
    assert_eq!(trace.output(), &output.logit);

    let mut grads = Gradients::new();
    let grad_image = discriminator
        .backward(&trace, &Tensor::ones(&[2, 4, 4, 1]), Some(&mut grads))
        .unwrap();
    assert_eq!(grad_image.shape(), image.shape());
    assert_eq!(grads.len(), 8);
    assert!(grads.iter().all(|(name, _)| name.starts_with("discriminator.")));
}

#[test]
fn test_feature_extractor_backward() {
    let mut rng = StdRng::seed_from_u64(2);
    let extractor = ConvFeatureExtractor::random(3, 4, &mut rng);
    let image = Tensor::uniform(-1.0, 1.0, &[1, 4, 4, 3], &mut rng);
    let features = extractor.extract(&image).unwrap();
    assert_eq!(features.shape(), &[1, 2, 2, 4]);
    assert_eq!(extractor.num_layers(), 6);

    let trace = extractor.extract_trace(&image).unwrap();
    let grad = extractor.backward(&trace, &Tensor::ones(features.shape())).unwrap();
    assert_eq!(grad.shape(), image.shape());
}

#[test]
fn test_vgg19_from_npz() {
    use ndarray_npy::NpzWriter;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vgg19.npz");
    let channels = [
        ("conv1_1", 3, 2),
        ("conv1_2", 2, 2),
        ("conv2_1", 2, 2),
        ("conv2_2", 2, 2),
        ("conv3_1", 2, 2),
        ("conv3_2", 2, 2),
        ("conv3_3", 2, 2),
        ("conv3_4", 2, 2),
        ("conv4_1", 2, 2),
        ("conv4_2", 2, 2),
        ("conv4_3", 2, 2),
        ("conv4_4", 2, 2),
    ];
    {
        let mut npz = NpzWriter::new(std::fs::File::create(&path).unwrap());
        for (name, cin, cout) in channels {
            let w = ndarray::ArrayD::<f32>::from_elem(ndarray::IxDyn(&[3, 3, cin, cout]), 0.01);
            let b = ndarray::ArrayD::<f32>::zeros(ndarray::IxDyn(&[cout]));
            npz.add_array(format!("{name}_W"), &w).unwrap();
            npz.add_array(format!("{name}_b"), &b).unwrap();
        }
        npz.finish().unwrap();
    }

    let extractor = ConvFeatureExtractor::vgg19_from_npz(&path).unwrap();
    // 预处理 + 12个卷积 + 11个ReLU + 3个池化
    assert_eq!(extractor.num_layers(), 27);
    let features = extractor.extract(&Tensor::zeros(&[1, 16, 16, 3])).unwrap();
    assert_eq!(features.shape(), &[1, 2, 2, 2]);

    assert!(ConvFeatureExtractor::vgg19_from_npz(&dir.path().join("missing.npz")).is_err());
}
