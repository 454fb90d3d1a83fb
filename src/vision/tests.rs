use crate::data::DataError;
use crate::vision::Vision;
use image::{Rgb, RgbImage};

#[test]
fn test_save_load_and_resize() {
    let dir = tempfile::tempdir().unwrap();
    let image = RgbImage::from_pixel(4, 2, Rgb([10, 200, 30]));
    let path = dir.path().join("a/b/test.png");
    Vision::save(&image, &path).unwrap();

    let same = Vision::load_resized(&path, [2, 4]).unwrap();
    assert_eq!(same, image);

    let resized = Vision::load_resized(&path, [6, 3]).unwrap();
    assert_eq!(resized.dimensions(), (3, 6));
    // 纯色图缩放后仍为同一颜色
    assert_eq!(*resized.get_pixel(1, 1), Rgb([10, 200, 30]));

    assert!(matches!(
        Vision::load_resized(&dir.path().join("missing.png"), [2, 2]),
        Err(DataError::Image { .. })
    ));
}

#[test]
fn test_to_gray() {
    let mut image = RgbImage::new(2, 1);
    image.put_pixel(0, 0, Rgb([255, 255, 255]));
    image.put_pixel(1, 0, Rgb([255, 0, 0]));
    let gray = Vision::to_gray(&image);
    assert_eq!(gray.get_pixel(0, 0).0, [255]);
    // 0.299 × 255 = 76.245
    assert_eq!(gray.get_pixel(1, 0).0, [76]);
}

#[test]
fn test_list_images_sorted_and_filtered() {
    let dir = tempfile::tempdir().unwrap();
    let image = RgbImage::new(2, 2);
    Vision::save(&image, &dir.path().join("b.png")).unwrap();
    Vision::save(&image, &dir.path().join("a.jpg")).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
    std::fs::create_dir(dir.path().join("sub.png")).unwrap();

    let files = Vision::list_images(dir.path()).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["a.jpg", "b.png"]);

    assert!(matches!(
        Vision::list_images(&dir.path().join("nope")),
        Err(DataError::DirNotFound(_))
    ));
}
