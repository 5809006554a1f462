//! Integration tests for the histogram accumulator and equalizer.

use frame_equalizer::equalize::{AlphaPolicy, EqualizationTable, Equalizer};
use frame_equalizer::error::EqualizationError;
use frame_equalizer::frame::{PixelBuffer, PixelFormat};
use frame_equalizer::histogram::{Histogram, CHANNELS, MAX_BINS};

/// Small deterministic generator so failures reproduce.
struct XorShift(u32);

impl XorShift {
    fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }

    /// Value in `low..low + span`.
    fn value(&mut self, low: u8, span: u8) -> u8 {
        low + (self.next() % span as u32) as u8
    }
}

fn noisy_image(format: PixelFormat, width: usize, height: usize, low: u8, span: u8, seed: u32) -> PixelBuffer {
    let mut rng = XorShift(seed);
    let pixels: Vec<[u8; 4]> = (0..width * height)
        .map(|_| {
            [
                rng.value(low, span),
                rng.value(low, span),
                rng.value(low, span),
                rng.value(0, 255),
            ]
        })
        .collect();
    PixelBuffer::from_rgba_pixels(format, width, height, &pixels).unwrap()
}

#[test]
fn test_bin_counts_sum_to_pixel_count_for_every_bin_count() {
    let buffer = noisy_image(PixelFormat::Bgra8, 13, 7, 0, 255, 7);
    for bins in 1..=MAX_BINS {
        let histogram = Histogram::from_buffer(&buffer, bins).unwrap();
        for channel in 0..CHANNELS {
            let sum: u64 = histogram.channel(channel).iter().sum();
            assert_eq!(sum, 91, "bins={bins} channel={channel}");
        }
    }
}

#[test]
fn test_all_black_image_has_color_mass_in_bin_zero() {
    let black = vec![[0, 0, 0, 255]; 12];
    for format in [PixelFormat::Rgba8, PixelFormat::Argb8] {
        let buffer = PixelBuffer::from_rgba_pixels(format, 4, 3, &black).unwrap();
        for bins in [1, 2, 32, 256] {
            let histogram = Histogram::from_buffer(&buffer, bins).unwrap();
            for channel in [histogram.red(), histogram.green(), histogram.blue()] {
                assert_eq!(channel[0], 12);
            }
        }
    }
}

#[test]
fn test_tables_are_monotonic() {
    for seed in 1..20 {
        let buffer = noisy_image(PixelFormat::Rgba8, 9, 9, (seed * 7) as u8, 60, seed);
        for bins in [1, 2, 7, 32, 100, 256] {
            let histogram = Histogram::from_buffer(&buffer, bins).unwrap();
            let table = EqualizationTable::from_histogram(&histogram).unwrap();
            assert!(table.is_monotonic(), "seed={seed} bins={bins}");
        }
    }
}

#[test]
fn test_equalization_is_idempotent() {
    for seed in 1..10 {
        let mut once = noisy_image(PixelFormat::Rgba8, 16, 8, 90, 40, seed);
        let mut equalizer = Equalizer::new(AlphaPolicy::Remap);
        equalizer.equalize(&mut once).unwrap();

        let mut twice = once.clone();
        equalizer.equalize(&mut twice).unwrap();

        for y in 0..8 {
            for x in 0..16 {
                let (a, b) = (once.rgba_at(x, y).unwrap(), twice.rgba_at(x, y).unwrap());
                for c in 0..4 {
                    assert!(a[c].abs_diff(b[c]) <= 1, "seed={seed} ({x},{y}) {a:?} vs {b:?}");
                }
            }
        }
    }
}

#[test]
fn test_equalization_stretches_to_full_range() {
    let mut buffer = noisy_image(PixelFormat::Rgba8, 16, 16, 100, 20, 3);
    Equalizer::new(AlphaPolicy::Preserve).equalize(&mut buffer).unwrap();
    let reds: Vec<u8> = (0..16 * 16)
        .map(|i| buffer.rgba_at(i % 16, i / 16).unwrap()[0])
        .collect();
    assert_eq!(reds.iter().min(), Some(&0));
    assert_eq!(reds.iter().max(), Some(&255));
}

#[test]
fn test_preserve_leaves_alpha_untouched() {
    let original = noisy_image(PixelFormat::Argb8, 8, 8, 50, 100, 11);
    let mut buffer = original.clone();
    Equalizer::new(AlphaPolicy::Preserve).equalize(&mut buffer).unwrap();
    for y in 0..8 {
        for x in 0..8 {
            assert_eq!(buffer.rgba_at(x, y).unwrap()[3], original.rgba_at(x, y).unwrap()[3]);
        }
    }
}

#[test]
fn test_external_histogram_must_match_buffer() {
    let mut buffer = noisy_image(PixelFormat::Rgba8, 4, 4, 0, 255, 5);
    let histogram = Histogram::from_buffer(&buffer, 32).unwrap();
    let mut equalizer = Equalizer::new(AlphaPolicy::Preserve);
    assert!(equalizer.equalize_with(&mut buffer, &histogram).is_ok());

    let mut larger = noisy_image(PixelFormat::Rgba8, 8, 4, 0, 255, 5);
    assert_eq!(
        equalizer.equalize_with(&mut larger, &histogram).err(),
        Some(EqualizationError::SampleCountMismatch {
            histogram: 16,
            buffer: 32
        })
    );
}

#[test]
fn test_zero_area_buffer_is_rejected() {
    let mut buffer = PixelBuffer::new(PixelFormat::Rgba8, 5, 0);
    assert_eq!(
        Equalizer::new(AlphaPolicy::Preserve).equalize(&mut buffer).err(),
        Some(EqualizationError::EmptyBuffer { width: 5, height: 0 })
    );
    // The accumulator itself tolerates zero pixels
    assert_eq!(Histogram::from_buffer(&buffer, 32).unwrap().total(), 0);
}
