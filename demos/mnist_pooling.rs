//! Trains a Spatial Pooler on MNIST digits and checks how well its SDRs separate the classes.
//!
//! The MNIST files are read from `data/` (unpacked `train-images-idx3-ubyte` etc.).
//! Each label gets a "prototype": how often every column fired for training images of that label.
//! A test image is assigned the label whose prototype overlaps its SDR the most.
//!
//! Run with `RUST_LOG=info` to see the pooler's parameters and progress.

use anyhow::{ensure, Context, Result};
use htm_sp::core::spatial_pooler::{SpatialPooler, SpatialPoolerParams};
use log::info;
use mnist::{Mnist, MnistBuilder};

const IMAGE_SIZE: usize = 28 * 28;
const TRAINING_LEN: usize = 10_000;
const TESTING_LEN: usize = 2_000;

fn binarize(image: &[u8], buffer: &mut [bool]) {
    for (bit, &pixel) in buffer.iter_mut().zip(image) {
        *bit = pixel > 127;
    }
}

fn main() -> Result<()> {
    env_logger::init();

    info!("Loading MNIST dataset...");
    let Mnist {
        trn_img,
        trn_lbl,
        tst_img,
        tst_lbl,
        ..
    } = MnistBuilder::new()
        .label_format_digit()
        .base_path("data/")
        .training_set_length(TRAINING_LEN as u32)
        .test_set_length(TESTING_LEN as u32)
        .finalize();

    let mut sp = SpatialPooler::new(SpatialPoolerParams {
        input_dimensions: vec![28, 28],
        column_dimensions: vec![32, 32],
        potential_radius: IMAGE_SIZE,
        potential_pct: 0.1,
        global_inhibition: true,
        num_active_columns_per_inh_area: 40,
        stimulus_threshold: 2,
        syn_perm_inactive_dec: 0.01,
        syn_perm_active_inc: 0.04,
        syn_perm_connected: 0.2,
        boost_strength: 1.0,
        seed: 42,
        sp_verbosity: 1,
        ..Default::default()
    })
    .context("failed to initialize the spatial pooler")?;

    let num_columns = sp.num_columns();
    let mut input = vec![false; IMAGE_SIZE];
    let mut active = vec![false; num_columns];
    let mut prototypes = vec![vec![0u32; num_columns]; 10];

    info!("Training on {} images...", trn_lbl.len());
    for (i, &label) in trn_lbl.iter().enumerate() {
        binarize(&trn_img[i * IMAGE_SIZE..(i + 1) * IMAGE_SIZE], &mut input);
        sp.compute(&input, true, &mut active)?;
        for &column in sp.active_columns() {
            prototypes[label as usize][column] += 1;
        }
        if (i + 1) % 1000 == 0 {
            info!("  {} images, inhibition radius {}", i + 1, sp.inhibition_radius());
        }
    }

    let used = sp.active_duty_cycles().iter().filter(|&&d| d > 0.0).count();
    info!("{} of {} columns were active at least once", used, num_columns);

    info!("Testing on {} images...", tst_lbl.len());
    let mut correct = 0usize;
    for (i, &label) in tst_lbl.iter().enumerate() {
        binarize(&tst_img[i * IMAGE_SIZE..(i + 1) * IMAGE_SIZE], &mut input);
        sp.compute(&input, false, &mut active)?;

        let scores = prototypes.iter().map(|prototype| {
            sp.active_columns()
                .iter()
                .map(|&column| prototype[column] as u64)
                .sum::<u64>()
        });
        let predicted = scores
            .enumerate()
            .max_by_key(|&(_, score)| score)
            .map(|(digit, _)| digit)
            .unwrap_or(0);

        if predicted == label as usize {
            correct += 1;
        }
    }

    println!(
        "Accuracy: {:.2}%, Total: {} images, Correct: {}",
        100.0 * correct as f32 / tst_lbl.len() as f32,
        tst_lbl.len(),
        correct
    );

    let mut saved = Vec::new();
    sp.save(&mut saved)?;
    let mut restored = SpatialPooler::load(&mut saved.as_slice())?;
    binarize(&tst_img[..IMAGE_SIZE], &mut input);
    let mut restored_active = vec![false; num_columns];
    sp.compute(&input, false, &mut active)?;
    restored.compute(&input, false, &mut restored_active)?;
    ensure!(active == restored_active, "restored pooler diverged");
    println!("Saved state: {} bytes, reload reproduces the same SDRs.", saved.len());

    Ok(())
}
