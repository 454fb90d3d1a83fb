use super::{ExportManifest, MANIFEST_FILE, ValidationExporter, export_generator};
use crate::nn::{Module, StyleGenerator};
use crate::vision::Vision;
use image::{Rgb, RgbImage};
use ndarray_npy::NpzReader;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn generator() -> StyleGenerator {
    StyleGenerator::new(3, 2, &mut StdRng::seed_from_u64(1))
}

#[test]
fn test_validation_export_writes_pairs() {
    let val = tempfile::tempdir().unwrap();
    let samples = tempfile::tempdir().unwrap();
    for i in 0..2u8 {
        let image = RgbImage::from_pixel(6, 6, Rgb([i * 50, 20, 30]));
        Vision::save(&image, &val.path().join(format!("v{i}.png"))).unwrap();
    }
    let exporter = ValidationExporter::new(val.path(), [4, 4], samples.path()).unwrap();
    assert_eq!(exporter.num_images(), 2);

    let written = exporter.export(&generator(), 7).unwrap();
    assert_eq!(written, 2);
    let dir = samples.path().join("007");
    for name in ["000_a.jpg", "000_b.jpg", "001_a.jpg", "001_b.jpg"] {
        assert!(dir.join(name).is_file(), "缺少 {name}");
    }
    let output = Vision::load_resized(&dir.join("001_b.jpg"), [4, 4]).unwrap();
    assert_eq!(output.dimensions(), (4, 4));
}

#[test]
fn test_validation_export_without_val_dir() {
    let samples = tempfile::tempdir().unwrap();
    let exporter = ValidationExporter::new(&samples.path().join("none"), [4, 4], samples.path()).unwrap();
    assert_eq!(exporter.export(&generator(), 0).unwrap(), 0);
    assert!(exporter.epoch_dir(0).is_dir());
}

#[test]
fn test_export_generator_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let g = generator();
    let path = export_generator(&g, dir.path(), "model", 1, [4, 4], 3).unwrap();
    export_generator(&g, dir.path(), "model", 2, [4, 4], 3).unwrap();

    let npz = NpzReader::new(std::fs::File::open(path).unwrap()).unwrap();
    assert_eq!(npz.len(), g.parameters().len());

    let json = std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
    let manifest: ExportManifest = serde_json::from_str(&json).unwrap();
    assert_eq!(manifest.epoch, 2);
    assert_eq!(manifest.identity, "model");
    assert_eq!(manifest.parameters.len(), g.parameters().len());
    assert_eq!(manifest.parameters["generator.out.bias"], vec![3]);
}
