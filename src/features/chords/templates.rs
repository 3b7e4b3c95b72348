//! Chord templates
//!
//! One L2-normalized binary mask per (root, quality): 12 roots x 13 qualities.
//! Templates are ordered by quality complexity, then root, so a linear scan
//! that only replaces the best on a strictly higher score resolves ties
//! toward simpler chords.

use crate::analysis::chord::{ChordLabel, ChordQuality, PitchClass};
use std::sync::OnceLock;

/// A single chord template
#[derive(Debug, Clone, PartialEq)]
pub struct ChordTemplate {
    /// Template label
    pub label: ChordLabel,
    /// Unit-norm pitch-class mask
    pub mask: [f32; 12],
}

impl ChordTemplate {
    /// Build the template for a root and quality
    pub fn new(root: PitchClass, quality: ChordQuality) -> Self {
        let mut mask = [0.0f32; 12];
        for &interval in quality.intervals() {
            mask[root.transpose(interval as u8).index()] = 1.0;
        }
        let norm = mask.iter().map(|x| x * x).sum::<f32>().sqrt();
        for x in mask.iter_mut() {
            *x /= norm;
        }
        Self {
            label: ChordLabel::chord(root, quality),
            mask,
        }
    }

    /// Dot product with a chroma vector
    ///
    /// Equals the cosine similarity when `chroma` is unit-norm.
    pub fn dot(&self, chroma: &[f32; 12]) -> f32 {
        self.mask.iter().zip(chroma.iter()).map(|(m, c)| m * c).sum()
    }
}

/// Immutable set of chord templates
#[derive(Debug, Clone)]
pub struct TemplateBank {
    templates: Vec<ChordTemplate>,
}

impl TemplateBank {
    /// Full bank: every root with every supported quality
    pub fn new() -> Self {
        Self::with_qualities(&ChordQuality::ALL)
    }

    /// Bank restricted to the given qualities
    pub fn with_qualities(qualities: &[ChordQuality]) -> Self {
        let mut qualities = qualities.to_vec();
        qualities.sort_by_key(|q| q.complexity_rank());
        qualities.dedup();

        let templates = qualities
            .iter()
            .flat_map(|&quality| PitchClass::all().map(move |root| ChordTemplate::new(root, quality)))
            .collect::<Vec<_>>();

        log::debug!("Built template bank with {} templates", templates.len());
        Self { templates }
    }

    /// Process-wide full bank, built on first use
    pub fn shared() -> &'static TemplateBank {
        static BANK: OnceLock<TemplateBank> = OnceLock::new();
        BANK.get_or_init(TemplateBank::new)
    }

    /// All templates in tie-break order
    pub fn templates(&self) -> &[ChordTemplate] {
        &self.templates
    }

    /// Number of templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the bank has no templates
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Look up the template for a label
    pub fn get(&self, label: &ChordLabel) -> Option<&ChordTemplate> {
        self.templates.iter().find(|t| &t.label == label)
    }
}

impl Default for TemplateBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_size() {
        let bank = TemplateBank::new();
        assert_eq!(bank.len(), 12 * ChordQuality::ALL.len());
        assert!(!bank.is_empty());
    }

    #[test]
    fn test_template_masks_are_unit_norm() {
        for t in TemplateBank::shared().templates() {
            let norm: f32 = t.mask.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-6, "{} has norm {}", t.label, norm);
        }
    }

    #[test]
    fn test_c_major_mask() {
        let bank = TemplateBank::new();
        let c = bank
            .get(&ChordLabel::chord(PitchClass::new(0), ChordQuality::Major))
            .unwrap();
        let active: Vec<usize> = (0..12).filter(|&i| c.mask[i] > 0.0).collect();
        assert_eq!(active, vec![0, 4, 7]);
    }

    #[test]
    fn test_ordering_simplest_first() {
        let bank = TemplateBank::new();
        let ranks: Vec<usize> = bank
            .templates()
            .iter()
            .map(|t| t.label.quality().unwrap().complexity_rank())
            .collect();
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(bank.templates()[0].label.to_string(), "C");
    }

    #[test]
    fn test_restricted_bank() {
        let bank = TemplateBank::with_qualities(&[ChordQuality::Minor, ChordQuality::Major]);
        assert_eq!(bank.len(), 24);
        assert_eq!(bank.templates()[0].label.quality(), Some(ChordQuality::Major));
    }

    #[test]
    fn test_shared_is_singleton() {
        assert!(std::ptr::eq(TemplateBank::shared(), TemplateBank::shared()));
    }
}
