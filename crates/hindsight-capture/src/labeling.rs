use hindsight_core::loops::{LoopDetector, LoopSignature};
use hindsight_core::model::{Fragment, FragmentKind};
use hindsight_core::signals;

use crate::segment::Segmenter;
use crate::trajectory::RawStep;

/// Signature of a recorded step. Steps without an error observation get an
/// empty error text, so they never match anything.
pub fn step_signature(step: &RawStep, keyword_limit: usize) -> LoopSignature {
    let error_text = if signals::is_error(&step.observation) {
        step.observation.as_str()
    } else {
        ""
    };
    LoopSignature::new(step.action.clone(), error_text, keyword_limit)
}

/// Relabel fragments whose steps repeat one signature at least `min_repeat`
/// times as `loop`. Returns how many fragments were relabeled.
pub fn label_loops(
    fragments: &mut [Fragment],
    steps: &[RawStep],
    detector: &LoopDetector,
    segmenter: &Segmenter,
) -> usize {
    let mut relabeled = 0;
    for fragment in fragments.iter_mut() {
        if fragment.kind == FragmentKind::Loop {
            continue;
        }
        let range = fragment.step_range;
        let Some(slice) = steps.get(range.start..=range.end) else {
            continue;
        };
        let signatures: Vec<LoopSignature> = slice
            .iter()
            .map(|s| step_signature(s, detector.keyword_limit()))
            .collect();
        if detector.has_repeats(&signatures) {
            fragment.relabel(FragmentKind::Loop);
            fragment.description = segmenter.describe(FragmentKind::Loop, &fragment.actions);
            relabeled += 1;
        }
    }
    relabeled
}
