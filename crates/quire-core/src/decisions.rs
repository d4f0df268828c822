use std::collections::BTreeMap;

use serde_json::Value;

use crate::persistence::LocalCache;
use crate::persistence::REFEREE_DECISIONS_KEY;
use crate::state::Manuscript;
use crate::state::ManuscriptId;
use crate::state::RefereeDecision;

/// manuscript id -> referee id -> decision.
pub type DecisionMap = BTreeMap<ManuscriptId, BTreeMap<String, RefereeDecision>>;

/// Parses the cached decision payload. Anything malformed degrades to an
/// empty map (or drops the malformed entry) and is logged, never raised.
pub fn parse_decision_cache(raw: Option<&str>) -> DecisionMap {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return DecisionMap::new();
    };
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "referee decision cache is corrupt, starting empty");
            return DecisionMap::new();
        }
    };
    let Value::Object(manuscripts) = value else {
        tracing::warn!("referee decision cache is not an object, starting empty");
        return DecisionMap::new();
    };

    let mut decisions = DecisionMap::new();
    for (manuscript_id, entries) in manuscripts {
        let Value::Object(entries) = entries else {
            tracing::warn!(%manuscript_id, "skipping malformed decision cache entry");
            continue;
        };
        let parsed: BTreeMap<String, RefereeDecision> = entries
            .into_iter()
            .filter_map(|(referee, code)| match code {
                Value::String(code) => {
                    RefereeDecision::parse(&code).map(|decision| (referee, decision))
                }
                _ => None,
            })
            .collect();
        if !parsed.is_empty() {
            decisions.insert(ManuscriptId::new(manuscript_id), parsed);
        }
    }
    decisions
}

/// Folds server-side `referee_decisions` into `decisions` without touching
/// keys that are already present.
pub fn absorb_server_decisions(decisions: &mut DecisionMap, manuscripts: &[Manuscript]) {
    for manuscript in manuscripts {
        if manuscript.referee_decisions.is_empty() {
            continue;
        }
        let local = decisions.entry(manuscript.id.clone()).or_default();
        for (referee, decision) in &manuscript.referee_decisions {
            local
                .entry(referee.clone())
                .or_insert_with(|| decision.clone());
        }
    }
}

/// Local cache first, then server values for keys the cache lacks.
pub fn merge_decisions(local_cache: Option<&str>, manuscripts: &[Manuscript]) -> DecisionMap {
    let mut merged = parse_decision_cache(local_cache);
    absorb_server_decisions(&mut merged, manuscripts);
    merged
}

pub fn lookup<'a>(
    decisions: &'a DecisionMap,
    manuscript_id: &ManuscriptId,
    referee_id: &str,
) -> Option<&'a RefereeDecision> {
    decisions
        .get(manuscript_id)
        .and_then(|entries| entries.get(referee_id))
}

/// The session's authoritative view of referee decisions, backed by a
/// durable cache that is rewritten in full on every decision.
#[derive(Debug)]
pub struct DecisionStore<C> {
    cache: C,
    decisions: DecisionMap,
}

impl<C: LocalCache> DecisionStore<C> {
    pub fn load(cache: C) -> Self {
        let decisions = parse_decision_cache(cache.read(REFEREE_DECISIONS_KEY).as_deref());
        Self { cache, decisions }
    }

    pub fn absorb(&mut self, manuscripts: &[Manuscript]) {
        absorb_server_decisions(&mut self.decisions, manuscripts);
    }

    pub fn record_decision(
        &mut self,
        manuscript_id: &ManuscriptId,
        referee_id: &str,
        decision: RefereeDecision,
    ) {
        let mut next = self.decisions.clone();
        next.entry(manuscript_id.clone())
            .or_default()
            .insert(referee_id.to_string(), decision);
        self.decisions = next;
        self.persist();
    }

    pub fn get_decision(
        &self,
        manuscript_id: &ManuscriptId,
        referee_id: &str,
    ) -> Option<&RefereeDecision> {
        lookup(&self.decisions, manuscript_id, referee_id)
    }

    pub fn decisions(&self) -> &DecisionMap {
        &self.decisions
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut C {
        &mut self.cache
    }

    fn persist(&mut self) {
        let encoded = match serde_json::to_string(&self.decisions) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode referee decisions");
                return;
            }
        };
        if let Err(err) = self.cache.write(REFEREE_DECISIONS_KEY, &encoded) {
            tracing::warn!(error = %err, "failed to persist referee decisions");
        }
    }
}
