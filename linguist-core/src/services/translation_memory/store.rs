use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::model::TmEntry;
use super::{hash, normalize};
use crate::error::{CoreError, CoreResult};
use crate::model::document::TsDocument;
use crate::model::entry::TranslationType;
use crate::services::storage;

/// Loads the memory, filling in missing hashes and collapsing duplicates.
/// A missing file is an empty memory; an unreadable one is an error so a
/// later save cannot clobber it.
pub fn load(path: &Path) -> CoreResult<Vec<TmEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let data = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;

    let mut entries: Vec<TmEntry> = serde_json::from_str(&data).map_err(|e| {
        CoreError::TranslationMemory(format!("failed to parse {}: {e}", path.display()))
    })?;

    let mut migrated = false;

    for e in entries.iter_mut() {
        migrated |= ensure_norm_hash(e);
    }

    let (deduped, removed) = dedup(entries);
    if removed > 0 {
        migrated = true;
    }

    let mut final_entries = deduped;
    sort_entries(&mut final_entries);

    if migrated {
        tracing::info!(path = %path.display(), removed, "migrating translation memory");
        if let Err(e) = save(path, &final_entries) {
            tracing::warn!(error = %e, "failed to persist translation memory migration");
        }
    }

    Ok(final_entries)
}

pub fn save(path: &Path, entries: &[TmEntry]) -> CoreResult<()> {
    let mut v: Vec<TmEntry> = entries.to_vec();

    for e in v.iter_mut() {
        ensure_norm_hash(e);
    }

    let (mut v, _removed) = dedup(v);
    sort_entries(&mut v);

    let json = serde_json::to_string_pretty(&v)?;

    storage::write_atomic(path, json.as_bytes())
}

/// Collects every approved translation of a document. Vanished entries are
/// included: their text is still a valid translation of the source string.
pub fn harvest(doc: &TsDocument, source_lang: &str, target_lang: &str) -> Vec<TmEntry> {
    doc.messages()
        .filter(|(_, m)| !m.numerus)
        .filter_map(|(_, m)| {
            let t = m.translation.as_ref()?;
            if !matches!(t.kind, TranslationType::Finished | TranslationType::Vanished) {
                return None;
            }
            let text = t.text.primary();
            if text.trim().is_empty() {
                return None;
            }
            Some(TmEntry::new(source_lang, target_lang, &m.source, text))
        })
        .collect()
}

/// Harvests `doc` into the memory at `path`; returns the resulting size.
pub fn merge_into(path: &Path, doc: &TsDocument, source_lang: &str, target_lang: &str) -> CoreResult<usize> {
    let mut entries = load(path)?;
    let before = entries.len();
    entries.extend(harvest(doc, source_lang, target_lang));
    save(path, &entries)?;

    let (entries, _) = dedup(entries);
    tracing::info!(
        path = %path.display(),
        before,
        after = entries.len(),
        "harvested translations into memory"
    );
    Ok(entries.len())
}

fn ensure_norm_hash(e: &mut TmEntry) -> bool {
    let mut changed = false;

    if e.normalized.is_empty() {
        e.normalized = normalize::normalize(&e.original);
        changed = true;
    }

    if e.hash.is_empty() {
        e.hash = hash::hash_norm(&e.normalized);
        changed = true;
    }

    changed
}

fn dedup(entries: Vec<TmEntry>) -> (Vec<TmEntry>, usize) {
    let mut map: HashMap<(String, String, String), TmEntry> = HashMap::new();
    let mut removed = 0usize;

    for mut e in entries {
        ensure_norm_hash(&mut e);

        let key = (e.source_lang.clone(), e.target_lang.clone(), e.hash.clone());

        match map.get_mut(&key) {
            None => {
                map.insert(key, e);
            }
            Some(existing) => {
                if pick_better(existing, &e) {
                    *existing = e;
                }
                removed += 1;
            }
        }
    }

    (map.into_values().collect(), removed)
}

fn pick_better(current: &TmEntry, candidate: &TmEntry) -> bool {
    let cur_empty = current.translation.trim().is_empty();
    let cand_empty = candidate.translation.trim().is_empty();

    if cur_empty && !cand_empty {
        return true;
    }
    if !cur_empty && cand_empty {
        return false;
    }

    candidate.translation.len() > current.translation.len()
}

fn sort_entries(entries: &mut [TmEntry]) {
    entries.sort_by(|a, b| {
        (
            a.source_lang.as_str(),
            a.target_lang.as_str(),
            a.hash.as_str(),
            a.original.as_str(),
            a.translation.as_str(),
        )
            .cmp(&(
                b.source_lang.as_str(),
                b.target_lang.as_str(),
                b.hash.as_str(),
                b.original.as_str(),
                b.translation.as_str(),
            ))
    });
}
