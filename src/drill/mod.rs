/*!
 * Drill playback engine.
 *
 * - `model`: phrase pairs, drill items and sequences
 * - `sequence`: builds the ordered play list (plus filter and shuffle)
 * - `controller`: drives playback one utterance at a time
 * - `progress`: session and lifetime repetition counters
 */

pub mod controller;
pub mod model;
pub mod progress;
pub mod sequence;

pub use controller::{PlaybackController, PlaybackSettings, PlaybackSnapshot, PlaybackState};
pub use model::{DrillItem, DrillSequence, Language, PhraseId, PhrasePair};
pub use progress::{ProgressReporter, RepetitionCounters};
pub use sequence::{ALL_CATEGORIES, DrillPlan, PlanParams, build};
