use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::process::Command;

use sha2::{Digest, Sha256};

fn compute_file_hash(file_path: &Path) -> Result<String, io::Error> {
    let mut file = File::open(file_path)?;
    let mut hasher = Sha256::new();
    let mut buffer = Vec::new();

    file.read_to_end(&mut buffer)?;

    hasher.update(&buffer);

    let result = hasher.finalize();
    Ok(format!("{:x}", result))
}

/// Hash of the decoded 8-bit gray pixels, independent of how the PNG encoder
/// compresses them.
fn compute_pixel_hash(file_path: &Path) -> String {
    let pixels = image::open(file_path)
        .expect("failed to decode output image")
        .to_luma8()
        .into_raw();
    format!("{:x}", Sha256::digest(&pixels))
}

fn check_pixel_hash(file_path: &Path, expected_hash: &str) -> bool {
    let computed_hash = compute_pixel_hash(file_path);
    if computed_hash == expected_hash {
        println!("Hash matches the expected value.");
        true
    } else {
        println!(
            "Hash mismatch! Expected: {}, but got: {}",
            expected_hash, computed_hash
        );
        false
    }
}

fn equalizer_status(args: &[&str]) -> std::process::ExitStatus {
    Command::new(env!("CARGO_BIN_EXE_histogram-equalizer"))
        .args(args)
        .status()
        .expect("failed to execute process")
}

fn run_equalizer(args: &[&str]) {
    let status = equalizer_status(args);
    assert!(status.success(), "Command {:?} failed", args);
}

/// Dark gradient with a bright corner: plenty of room for equalization to spread it out.
fn write_test_image(path: &Path) {
    let image = image::RgbImage::from_fn(40, 25, |x, y| {
        if x > 35 && y > 20 {
            image::Rgb([250, 240, 255])
        } else {
            let level = ((x + y) % 64) as u8;
            image::Rgb([level, level / 2, level + 10])
        }
    });
    image.save(path).expect("failed to write test image");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equalize_batch_from_param_file() {
        let input_directory = Path::new("out/cli_regression/input");
        std::fs::create_dir_all(input_directory).unwrap();
        write_test_image(&input_directory.join("gradient.png"));
        std::fs::write(input_directory.join("ignored.txt"), b"not an image").unwrap();

        let mut hashes = Vec::new();
        for strategy in ["sequential", "message-passing", "shared-memory"] {
            run_equalizer(&[
                "equalize",
                "./tests/param_files/cli_regression.json",
                "--strategy",
                strategy,
                "--workers",
                "4",
            ]);
            let variant = match strategy {
                "sequential" => "Sequential",
                "message-passing" => "MessagePassing",
                _ => "SharedMemory",
            };
            let output_directory = Path::new("out/cli_regression/output").join(variant);
            assert!(output_directory.join("params.json").is_file());
            assert!(!output_directory.join("ignored.txt").exists());
            let output_path = output_directory.join("gradient.png");
            hashes.push(compute_file_hash(&output_path).unwrap());
        }

        // 40 x 25 = 1000 pixels split evenly across 4 workers: every variant agrees.
        assert_eq!(hashes[0], hashes[1]);
        assert_eq!(hashes[1], hashes[2]);

        let expected_hash = "b55bdd82a90854478d861c38fc61ab181a0b42c43d551a5f6ca4c64f5dc202c3";
        for variant in ["Sequential", "MessagePassing", "SharedMemory"] {
            let output_path = Path::new("out/cli_regression/output")
                .join(variant)
                .join("gradient.png");
            assert!(check_pixel_hash(&output_path, expected_hash));
        }
    }

    #[test]
    fn test_batch_with_only_corrupt_images_fails() {
        let directory = Path::new("out/cli_regression/all_broken");
        let input_directory = directory.join("input");
        std::fs::create_dir_all(&input_directory).unwrap();
        std::fs::write(input_directory.join("broken.png"), b"not a png").unwrap();

        let params_path = directory.join("params.json");
        let params = serde_json::json!({
            "input_directory": input_directory,
            "output_directory": directory.join("output"),
            "strategy": "Sequential",
        });
        std::fs::write(&params_path, params.to_string()).unwrap();

        let status = equalizer_status(&["equalize", params_path.to_str().unwrap()]);
        assert!(!status.success());
    }

    #[test]
    fn test_inspect_single_image() {
        let directory = Path::new("out/cli_regression/inspect");
        std::fs::create_dir_all(directory).unwrap();
        let path = directory.join("inspect.png");
        write_test_image(&path);
        run_equalizer(&["inspect", path.to_str().unwrap(), "--workers", "2"]);
    }
}
