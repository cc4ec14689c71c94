use rand::Rng;
use std::collections::HashSet;

use super::track::Track;

/// Fisher–Yates in situ: de la última posición hacia la 1, intercambia con
/// un índice uniforme en `[0, i]`. Cada una de las `n!` permutaciones es
/// igual de probable.
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Orden lógico de reproducción: `reverse(previous) + [current] + tracks`
pub fn logical_order(previous: &[Track], current: Option<&Track>, tracks: &[Track]) -> Vec<Track> {
    previous
        .iter()
        .rev()
        .chain(current)
        .chain(tracks.iter())
        .cloned()
        .collect()
}

/// Quita duplicados por cid conservando la primera aparición
pub fn dedup_by_cid(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen = HashSet::new();
    tracks
        .into_iter()
        .filter(|t| t.cid().map_or(true, |cid| seen.insert(cid.to_string())))
        .collect()
}

/// Añade al final de la copia las pistas que aún no están
pub fn push_to_backup(backup: &mut Vec<Track>, tracks: &[Track]) {
    let fresh = missing_from(backup, tracks);
    backup.extend(fresh);
}

/// Añade al principio de la copia las pistas que aún no están
pub fn unshift_to_backup(backup: &mut Vec<Track>, tracks: &[Track]) {
    let mut fresh = missing_from(backup, tracks);
    if !fresh.is_empty() {
        fresh.append(backup);
        *backup = fresh;
    }
}

fn missing_from(backup: &[Track], tracks: &[Track]) -> Vec<Track> {
    let known: HashSet<&str> = backup.iter().filter_map(Track::cid).collect();
    dedup_by_cid(
        tracks
            .iter()
            .filter(|t| t.cid().map_or(true, |cid| !known.contains(cid)))
            .cloned()
            .collect(),
    )
}

/// Deja en la copia solo los cids presentes en la cola
pub fn prune_backup<'a>(backup: &mut Vec<Track>, present: impl IntoIterator<Item = &'a Track>) {
    let present: HashSet<&str> = present.into_iter().filter_map(Track::cid).collect();
    backup.retain(|t| t.cid().is_some_and(|cid| present.contains(cid)));
}

/// Reconstruye `previous` (más reciente primero, solo resueltas) y `tracks`
/// a partir de la copia, partiendo en `previous_len` tras quitar la actual.
/// Las pistas sin resolver del tramo del historial vuelven al frente de `tracks`.
pub fn restore_order(
    backup: &[Track],
    previous_len: usize,
    current: Option<&Track>,
) -> (Vec<Track>, Vec<Track>) {
    let current_cid = current.and_then(Track::cid);
    let ordered: Vec<Track> = backup
        .iter()
        .filter(|t| current_cid.is_none() || t.cid() != current_cid)
        .cloned()
        .collect();

    let split = previous_len.min(ordered.len());
    let (before, after) = ordered.split_at(split);

    let (resolved, pending): (Vec<Track>, Vec<Track>) =
        before.iter().cloned().partition(Track::is_resolved);

    let previous = resolved.into_iter().rev().collect();
    let tracks = pending.into_iter().chain(after.iter().cloned()).collect();
    (previous, tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::identity::{admit_tracks, Admission};
    use crate::audio::track::tests::resolved;
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, SeedableRng};
    use std::collections::HashMap;

    fn titles(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(Track::title).collect()
    }

    #[test]
    fn test_fisher_yates_is_uniform() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let trials = 60_000;
        let mut counts: HashMap<[u8; 3], usize> = HashMap::new();

        for _ in 0..trials {
            let mut items = [1u8, 2, 3];
            fisher_yates(&mut items, &mut rng);
            *counts.entry(items).or_default() += 1;
        }

        assert_eq!(counts.len(), 6);
        let expected = trials / 6;
        for (perm, count) in counts {
            let deviation = (count as f64 - expected as f64).abs() / expected as f64;
            assert!(deviation < 0.05, "{:?} aparece {} veces", perm, count);
        }
    }

    #[test]
    fn test_fisher_yates_trivial_lengths() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut empty: [u8; 0] = [];
        fisher_yates(&mut empty, &mut rng);
        let mut one = [7];
        fisher_yates(&mut one, &mut rng);
        assert_eq!(one, [7]);
    }

    #[test]
    fn test_backup_restores_partitions() {
        let all = admit_tracks(
            ["P2", "P1", "C", "T1", "T2"].iter().map(|t| resolved(t)).collect(),
            Admission::Queue,
            None,
            8,
        );
        let previous = vec![all[1].clone(), all[0].clone()];
        let current = all[2].clone();
        let tracks = vec![all[3].clone(), all[4].clone()];

        let backup = dedup_by_cid(logical_order(&previous, Some(&current), &tracks));
        assert_eq!(titles(&backup), vec!["P2", "P1", "C", "T1", "T2"]);

        let (prev, next) = restore_order(&backup, previous.len(), Some(&current));
        assert_eq!(titles(&prev), vec!["P1", "P2"]);
        assert_eq!(titles(&next), vec!["T1", "T2"]);
    }

    #[test]
    fn test_push_unshift_and_prune() {
        let all = admit_tracks(
            ["A", "B", "C"].iter().map(|t| resolved(t)).collect(),
            Admission::Queue,
            None,
            8,
        );
        let mut backup = vec![all[1].clone()];

        push_to_backup(&mut backup, &[all[1].clone(), all[2].clone()]);
        unshift_to_backup(&mut backup, &[all[0].clone()]);
        assert_eq!(titles(&backup), vec!["A", "B", "C"]);

        prune_backup(&mut backup, [&all[0], &all[2]]);
        assert_eq!(titles(&backup), vec!["A", "C"]);
    }
}
