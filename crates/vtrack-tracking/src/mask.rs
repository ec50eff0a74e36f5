//! Boolean region masks produced by the tracker.
//!
//! Masks are indexed `[row, column]`, i.e. `[y, x]`, with the same shape as
//! the frame they were produced for.

use imageproc::image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};
use ndarray::Array2;
use vtrack_models::BoundingBox;

/// Boolean per-pixel region of one track at one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask(Array2<bool>);

impl Mask {
    pub fn new(pixels: Array2<bool>) -> Self {
        Self(pixels)
    }

    /// Binarize a confidence field: a pixel is set when its logit is strictly
    /// above `threshold`.
    pub fn from_logits(logits: &Array2<f32>, threshold: f32) -> Self {
        Self(logits.mapv(|v| v > threshold))
    }

    pub fn pixels(&self) -> &Array2<bool> {
        &self.0
    }

    /// Number of set pixels.
    pub fn area(&self) -> usize {
        self.0.iter().filter(|&&p| p).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|&p| p)
    }

    /// Tight box around the set pixels, with inclusive max coordinates.
    ///
    /// `None` when no pixel is set.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;

        for ((y, x), &set) in self.0.indexed_iter() {
            if !set {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x1, y1, x2, y2)) => (x1.min(x), y1.min(y), x2.max(x), y2.max(y)),
            });
        }

        bounds.map(|(x1, y1, x2, y2)| {
            BoundingBox::new(x1 as f64, y1 as f64, x2 as f64, y2 as f64)
        })
    }

    /// Drop disconnected fragments lying entirely near the frame border.
    ///
    /// Fragments are 8-connected components. The largest component is the
    /// subject and is always kept. Any other component is discarded when
    /// every one of its pixels is closer to the border than
    /// `relative_distance` times the frame diagonal. A non-positive distance
    /// disables the filter.
    pub fn filter_edge_segments(&self, relative_distance: f64) -> Mask {
        if relative_distance <= 0.0 || self.is_empty() {
            return self.clone();
        }

        let (height, width) = self.0.dim();
        let diagonal = ((width * width + height * height) as f64).sqrt();
        let margin = relative_distance * diagonal;
        let near_border = |y: usize, x: usize| -> bool {
            let dx = x.min(width - 1 - x) as f64;
            let dy = y.min(height - 1 - y) as f64;
            dx.min(dy) < margin
        };

        let (labels, count) = label_components(&self.0);
        if count <= 1 {
            return self.clone();
        }

        // Indexed by label - 1.
        let mut areas = vec![0usize; count];
        let mut clear_of_border = vec![false; count];
        for ((y, x), &label) in labels.indexed_iter() {
            if label == 0 {
                continue;
            }
            areas[label - 1] += 1;
            if !near_border(y, x) {
                clear_of_border[label - 1] = true;
            }
        }

        // Ties go to the lowest label.
        let main = areas
            .iter()
            .enumerate()
            .fold(0, |best, (i, &area)| if area > areas[best] { i } else { best });

        let keep: Vec<bool> = (0..count)
            .map(|i| i == main || clear_of_border[i])
            .collect();

        Mask(labels.mapv(|label| label != 0 && keep[label - 1]))
    }
}

/// Label 8-connected components of set pixels. Label 0 is background;
/// components are numbered from 1. Returns the label image and the count.
fn label_components(pixels: &Array2<bool>) -> (Array2<usize>, usize) {
    let (height, width) = pixels.dim();
    let binary = GrayImage::from_fn(width as u32, height as u32, |x, y| {
        Luma([if pixels[[y as usize, x as usize]] { 255 } else { 0 }])
    });

    let labelled = connected_components(&binary, Connectivity::Eight, Luma([0u8]));
    let labels = Array2::from_shape_fn((height, width), |(y, x)| {
        labelled.get_pixel(x as u32, y as u32)[0] as usize
    });
    let count = labels.iter().copied().max().unwrap_or(0);

    (labels, count)
}
