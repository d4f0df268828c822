use crate::comments::authored_by;
use crate::comments::normalize_embedded;
use crate::decisions::lookup;
use crate::decisions::DecisionMap;
use crate::state::Comment;
use crate::state::Manuscript;
use crate::state::ManuscriptState;

/// Whether one assigned referee counts as having responded. Any of the
/// signals the services scatter around is enough.
pub fn referee_has_acted(
    manuscript: &Manuscript,
    decisions: &DecisionMap,
    comments: &[Comment],
    referee_id: &str,
) -> bool {
    lookup(decisions, &manuscript.id, referee_id).is_some()
        || manuscript.referee_decisions.contains_key(referee_id)
        || manuscript
            .referee_actions
            .iter()
            .any(|actor| actor == referee_id)
        || authored_by(comments, referee_id)
        || (manuscript.state == ManuscriptState::AuthorRevision
            && manuscript.has_referee(referee_id))
}

pub fn referees_awaiting<'a>(
    manuscript: &'a Manuscript,
    decisions: &DecisionMap,
    comments: &[Comment],
) -> Vec<&'a str> {
    manuscript
        .referees
        .iter()
        .filter(|referee| !referee_has_acted(manuscript, decisions, comments, referee))
        .map(String::as_str)
        .collect()
}

/// Review completeness using only what the manuscript record carries.
pub fn is_review_complete(manuscript: &Manuscript, decisions: &DecisionMap) -> bool {
    let embedded = normalize_embedded(manuscript, "");
    is_review_complete_with(manuscript, decisions, &embedded)
}

/// Review completeness with an explicit comment list (embedded plus fetched).
///
/// A single recorded decision from any assigned referee is enough to call the
/// review complete. That is the policy reviewers see today; do not tighten it
/// here. Decisions filed under other keys, such as an editor's own id, do not
/// count.
pub fn is_review_complete_with(
    manuscript: &Manuscript,
    decisions: &DecisionMap,
    comments: &[Comment],
) -> bool {
    if manuscript.referees.is_empty() {
        return false;
    }
    if manuscript.state.is_past_referee_review() {
        return true;
    }
    if manuscript
        .referees
        .iter()
        .all(|referee| referee_has_acted(manuscript, decisions, comments, referee))
    {
        return true;
    }
    manuscript.referees.iter().any(|referee| {
        lookup(decisions, &manuscript.id, referee).is_some()
            || manuscript.referee_decisions.contains_key(referee)
    })
}
