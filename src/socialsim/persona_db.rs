use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;

use crate::error::SelfPlayError;

use super::persona::Persona;

/// In-memory persona store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonaDb {
    personas: Vec<Persona>,
}

#[derive(Deserialize)]
struct HubRecord {
    persona: String,
}

fn stratum_key(value: Option<Value>) -> Option<String> {
    value.map(|v| match v {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

impl PersonaDb {
    pub fn new(personas: Vec<Persona>) -> Self {
        Self { personas }
    }

    /// Reads a JSON array of personas.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SelfPlayError> {
        let path = path.as_ref();
        let personas: Vec<Persona> = serde_json::from_slice(&fs::read(path)?)?;
        log::info!("Loaded {} personas from {}", personas.len(), path.display());
        Ok(Self { personas })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SelfPlayError> {
        let path = path.as_ref();
        fs::write(path, serde_json::to_vec(&self.personas)?)?;
        log::info!("Saved {} personas to {}", self.personas.len(), path.display());
        Ok(())
    }

    /// Imports a PersonaHub-style JSON Lines dump, one `{"persona": "..."}`
    /// object per line. Personas get ids `<source>_<n>` and source
    /// `personahub_<source>`. Lines that do not parse are skipped.
    pub fn from_jsonl(
        path: impl AsRef<Path>,
        source: &str,
        max: Option<usize>,
    ) -> Result<Self, SelfPlayError> {
        let path = path.as_ref();
        let reader = BufReader::new(fs::File::open(path)?);
        let limit = max.unwrap_or(usize::MAX);
        let mut personas = Vec::new();

        for (line_no, line) in reader.lines().enumerate() {
            if personas.len() >= limit {
                break;
            }
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HubRecord>(&line) {
                Ok(record) => {
                    let mut persona = Persona::new(format!("{source}_{}", personas.len()))
                        .with_description(record.persona);
                    persona.source = Some(format!("personahub_{source}"));
                    personas.push(persona);
                }
                Err(err) => log::warn!("{}:{}: skipping line: {err}", path.display(), line_no + 1),
            }
        }

        log::info!("Imported {} personas from {}", personas.len(), path.display());
        Ok(Self { personas })
    }

    pub fn push(&mut self, persona: Persona) {
        self.personas.push(persona);
    }

    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.id == id)
    }

    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    /// Draws up to `n` personas matching every `filter_by` entry.
    ///
    /// With `stratify_by`, each value of that attribute gets a share of the
    /// sample proportional to its frequency among the matches; rounding gaps
    /// are filled or trimmed at random. Fewer matches than `n` returns all of
    /// them with a warning.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        n: usize,
        stratify_by: Option<&str>,
        filter_by: &BTreeMap<String, Value>,
        rng: &mut R,
    ) -> Vec<&Persona> {
        let available: Vec<&Persona> = self
            .personas
            .iter()
            .filter(|p| filter_by.iter().all(|(k, v)| p.has_attribute(k, Some(v))))
            .collect();

        let mut n = n;
        if available.len() < n {
            log::warn!(
                "Requested {n} personas but only {} match the criteria",
                available.len()
            );
            n = available.len();
        }
        if n == 0 {
            return Vec::new();
        }

        let attribute = match stratify_by {
            Some(attr) if available.iter().any(|p| p.attribute(attr).is_some()) => attr,
            _ => return available.choose_multiple(rng, n).copied().collect(),
        };

        let mut strata: BTreeMap<Option<String>, Vec<&Persona>> = BTreeMap::new();
        for persona in available.iter().copied() {
            strata
                .entry(stratum_key(persona.attribute(attribute)))
                .or_default()
                .push(persona);
        }

        let total = available.len() as f64;
        let mut sampled: Vec<&Persona> = Vec::with_capacity(n);
        for members in strata.values() {
            let share = (n as f64 * members.len() as f64 / total).round() as usize;
            sampled.extend(members.choose_multiple(rng, share.min(members.len())).copied());
        }

        if sampled.len() < n {
            let remaining: Vec<&Persona> = available
                .iter()
                .copied()
                .filter(|p| !sampled.iter().any(|s| std::ptr::eq(*s, *p)))
                .collect();
            let missing = n - sampled.len();
            sampled.extend(remaining.choose_multiple(rng, missing).copied());
        } else if sampled.len() > n {
            sampled.shuffle(rng);
            sampled.truncate(n);
        }
        sampled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use std::io::Write;

    fn population() -> PersonaDb {
        let personas = (0..20)
            .map(|i| Persona {
                gender: Some(if i < 15 { "female" } else { "male" }.to_string()),
                age: Some(20 + i),
                ..Persona::new(format!("p{i}"))
            })
            .collect();
        PersonaDb::new(personas)
    }

    #[test]
    fn filter_restricts_the_pool() {
        let db = population();
        let mut rng = StdRng::seed_from_u64(7);
        let filter = BTreeMap::from([("gender".to_string(), json!("male"))]);
        let sample = db.sample(10, None, &filter, &mut rng);
        assert_eq!(sample.len(), 5);
        assert!(sample.iter().all(|p| p.gender.as_deref() == Some("male")));
    }

    #[test]
    fn stratified_sample_is_proportional() {
        let db = population();
        let mut rng = StdRng::seed_from_u64(42);
        let sample = db.sample(8, Some("gender"), &BTreeMap::new(), &mut rng);
        assert_eq!(sample.len(), 8);
        let female = sample
            .iter()
            .filter(|p| p.gender.as_deref() == Some("female"))
            .count();
        assert_eq!(female, 6);

        let mut ids: Vec<&str> = sample.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn unknown_stratum_attribute_falls_back_to_random() {
        let db = population();
        let mut rng = StdRng::seed_from_u64(1);
        let sample = db.sample(4, Some("shoe_size"), &BTreeMap::new(), &mut rng);
        assert_eq!(sample.len(), 4);
    }

    #[test]
    fn nothing_matching_yields_empty_sample() {
        let db = population();
        let mut rng = StdRng::seed_from_u64(1);
        let filter = BTreeMap::from([("gender".to_string(), json!("non_binary"))]);
        assert!(db.sample(3, Some("gender"), &filter, &mut rng).is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("personas.json");
        let db = population();
        db.save(&path).unwrap();
        let loaded = PersonaDb::load(&path).unwrap();
        assert_eq!(loaded, db);
        assert_eq!(loaded.get("p3").and_then(|p| p.age), Some(23));
        assert!(loaded.get("missing").is_none());
    }

    #[test]
    fn imports_personahub_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hub.jsonl");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, r#"{{"persona": "A marine biologist studying coral reefs."}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file, r#"{{"persona": "A jazz pianist from New Orleans."}}"#).unwrap();
        writeln!(file, r#"{{"persona": "A third persona past the limit."}}"#).unwrap();

        let db = PersonaDb::from_jsonl(&path, "elite", Some(2)).unwrap();
        assert_eq!(db.len(), 2);
        let second = db.get("elite_1").unwrap();
        assert_eq!(second.source.as_deref(), Some("personahub_elite"));
        assert_eq!(
            second.description.as_deref(),
            Some("A jazz pianist from New Orleans.")
        );
    }
}
