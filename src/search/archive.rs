//! Archive of the best-known encoding per objective, the canonical output
//! of a search run.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::encoding::TestCase;
use super::objective::{ObjectiveId, ObjectivePool};

/// Best-known encoding for one objective, with the distance it achieved.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// The encoding, owned by the archive.
    pub encoding: TestCase,
    /// Distance the encoding achieved against the objective.
    pub distance: f64,
}

/// Mapping from objective to the encoding currently judged best for it.
///
/// Per-objective best distances are non-increasing over a run: an entry is
/// replaced only on strict improvement, so ties keep the incumbent (the
/// first encoding to reach a distance owns the entry). Entries are removed
/// only by [`clear`](Archive::clear); objectives that become unreachable
/// keep their best-known encoding.
#[derive(Debug, Default)]
pub struct Archive {
    entries: BTreeMap<ObjectiveId, ArchiveEntry>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer an encoding for an objective. Returns `true` if the entry was
    /// inserted or replaced.
    pub fn update(&mut self, objective: ObjectiveId, encoding: &TestCase, distance: f64) -> bool {
        match self.entries.get(&objective) {
            Some(current) if distance >= current.distance => false,
            _ => {
                self.entries.insert(
                    objective,
                    ArchiveEntry {
                        encoding: encoding.clone(),
                        distance,
                    },
                );
                true
            }
        }
    }

    /// Best-known entry for an objective.
    pub fn get(&self, objective: ObjectiveId) -> Option<&ArchiveEntry> {
        self.entries.get(&objective)
    }

    /// Best-known distance for an objective.
    pub fn best_distance(&self, objective: ObjectiveId) -> Option<f64> {
        self.entries.get(&objective).map(|e| e.distance)
    }

    /// Objectives with an archived encoding, in handle order.
    pub fn objectives(&self) -> impl Iterator<Item = ObjectiveId> + '_ {
        self.entries.keys().copied()
    }

    /// All entries, in objective-handle order.
    pub fn entries(&self) -> impl Iterator<Item = (ObjectiveId, &ArchiveEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    /// Whether an encoding (by id) is archived for any objective.
    pub fn contains_encoding(&self, encoding: &TestCase) -> bool {
        self.entries.values().any(|e| e.encoding.id() == encoding.id())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Explicit reset. The only way entries leave the archive.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Write one JSON file per archived objective into `dir`, returning the
    /// written paths. Identifiers are resolved through the pool the
    /// objectives were registered in.
    pub fn write_json<P: AsRef<Path>>(
        &self,
        pool: &ObjectivePool,
        dir: P,
    ) -> io::Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut paths = Vec::with_capacity(self.entries.len());
        for (objective, entry) in &self.entries {
            let export = ArchivedTest {
                objective: pool.identifier(*objective).to_string(),
                distance: entry.distance,
                encoding_id: entry.encoding.id().to_string(),
                length: entry.encoding.length(),
                assertions: entry
                    .encoding
                    .assertions()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                meta_comments: entry.encoding.meta_comments(),
            };

            let filename = format!("{objective}_{}.json", sanitize(&export.objective));
            let path = dir.join(filename);
            let json = serde_json::to_string_pretty(&export)?;
            fs::write(&path, json)?;
            paths.push(path);
        }
        Ok(paths)
    }
}

fn sanitize(identifier: &str) -> String {
    identifier
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Exported archive entry format.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ArchivedTest {
    /// Objective identifier.
    pub objective: String,
    /// Distance the archived encoding achieved.
    pub distance: f64,
    /// Id of the archived encoding.
    pub encoding_id: String,
    /// Gene-tree node count of the encoding.
    pub length: usize,
    /// Assertions attached to the test case.
    pub assertions: BTreeMap<String, String>,
    /// Meta comments attached to the test case.
    pub meta_comments: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::gene::GeneNode;
    use crate::search::objective::FunctionObjective;

    fn encoding() -> TestCase {
        TestCase::new(GeneNode::leaf("1.0", "num"))
    }

    #[test]
    fn test_update_inserts_and_improves() {
        let objective = ObjectiveId::for_tests(0);
        let mut archive = Archive::new();

        assert!(archive.update(objective, &encoding(), 0.8));
        assert_eq!(archive.best_distance(objective), Some(0.8));

        assert!(archive.update(objective, &encoding(), 0.3));
        assert_eq!(archive.best_distance(objective), Some(0.3));
    }

    #[test]
    fn test_ties_keep_incumbent() {
        let objective = ObjectiveId::for_tests(0);
        let mut archive = Archive::new();

        let first = encoding();
        archive.update(objective, &first, 0.5);
        let incumbent = archive.get(objective).unwrap().encoding.id();

        assert!(!archive.update(objective, &encoding(), 0.5));
        assert_eq!(archive.get(objective).unwrap().encoding.id(), incumbent);
    }

    #[test]
    fn test_best_distance_non_increasing() {
        let objective = ObjectiveId::for_tests(0);
        let mut archive = Archive::new();

        let mut best_seen = f64::INFINITY;
        for offered in [0.9, 0.4, 0.7, 0.4, 0.1, 0.5] {
            archive.update(objective, &encoding(), offered);
            let best = archive.best_distance(objective).unwrap();
            assert!(best <= best_seen);
            best_seen = best;
        }
        assert_eq!(best_seen, 0.1);
    }

    #[test]
    fn test_clear_is_only_removal() {
        let mut archive = Archive::new();
        archive.update(ObjectiveId::for_tests(0), &encoding(), 0.0);
        archive.update(ObjectiveId::for_tests(1), &encoding(), 0.2);
        assert_eq!(archive.len(), 2);

        archive.clear();
        assert!(archive.is_empty());
    }

    #[test]
    fn test_write_json() {
        let mut pool = ObjectivePool::new();
        let objective = pool.register(Box::new(FunctionObjective::new("f0")));

        let mut archived = encoding();
        archived.add_meta_comment("covers f0");
        let mut archive = Archive::new();
        archive.update(objective, &archived, 0.0);

        let dir = tempfile::tempdir().unwrap();
        let paths = archive.write_json(&pool, dir.path()).unwrap();
        assert_eq!(paths.len(), 1);

        let content = std::fs::read_to_string(&paths[0]).unwrap();
        let parsed: ArchivedTest = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.objective, "f0");
        assert_eq!(parsed.distance, 0.0);
        assert_eq!(parsed.meta_comments, vec!["covers f0".to_string()]);
    }
}
