//! Breakpoint registry keyed by canonical file and line.

#![allow(missing_docs)]

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use smol_str::SmolStr;

/// Client request for one breakpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointSpec {
    pub line: u32,
    pub condition: Option<String>,
    pub temporary: bool,
    pub ignore_count: u32,
}

impl BreakpointSpec {
    #[must_use]
    pub fn new(line: u32) -> Self {
        Self {
            line,
            condition: None,
            temporary: false,
            ignore_count: 0,
        }
    }

    /// Blank conditions mean "no condition".
    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        let condition = condition.into();
        self.condition = if condition.trim().is_empty() {
            None
        } else {
            Some(condition)
        };
        self
    }

    #[must_use]
    pub fn temporary(mut self) -> Self {
        self.temporary = true;
        self
    }

    #[must_use]
    pub fn with_ignore_count(mut self, ignore_count: u32) -> Self {
        self.ignore_count = ignore_count;
        self
    }
}

/// Registered breakpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    id: u32,
    file: SmolStr,
    line: u32,
    temporary: bool,
    condition: Option<String>,
    pub enabled: bool,
    pub ignore_count: u32,
    pub hit_count: u32,
}

impl Breakpoint {
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Canonical file.
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    #[must_use]
    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }
}

/// Canonical file key: synthetic `<...>` identifiers pass through, everything else is made
/// absolute and case-folded.
#[must_use]
pub fn canonical_path(raw: &str) -> SmolStr {
    if raw.starts_with('<') && raw.ends_with('>') {
        return SmolStr::new(raw);
    }
    let absolute = std::path::absolute(Path::new(raw))
        .map_or_else(|_| raw.to_string(), |path| path.to_string_lossy().into_owned());
    SmolStr::new(absolute.to_lowercase())
}

/// Canonical file -> line -> breakpoints in insertion order.
#[derive(Debug, Default)]
pub struct BreakpointRegistry {
    files: HashMap<SmolStr, BTreeMap<u32, Vec<Breakpoint>>>,
    // Append-only; never invalidated.
    canonical: HashMap<String, SmolStr>,
    next_id: u32,
}

impl BreakpointRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonicalize `raw`, caching the result by the raw string.
    pub fn canonicalize(&mut self, raw: &str) -> SmolStr {
        if let Some(found) = self.canonical.get(raw) {
            return found.clone();
        }
        let canonical = canonical_path(raw);
        self.canonical.insert(raw.to_string(), canonical.clone());
        canonical
    }

    /// Replace every breakpoint of `file`; returns the new entries.
    pub fn set_breakpoints(&mut self, file: &str, specs: Vec<BreakpointSpec>) -> Vec<Breakpoint> {
        let key = self.canonicalize(file);
        self.files.remove(&key);
        specs
            .into_iter()
            .map(|spec| self.insert(key.clone(), spec))
            .collect()
    }

    /// Append a single breakpoint.
    pub fn add(&mut self, file: &str, spec: BreakpointSpec) -> Breakpoint {
        let key = self.canonicalize(file);
        self.insert(key, spec)
    }

    fn insert(&mut self, file: SmolStr, spec: BreakpointSpec) -> Breakpoint {
        self.next_id = self.next_id.saturating_add(1);
        let breakpoint = Breakpoint {
            id: self.next_id,
            file: file.clone(),
            line: spec.line,
            temporary: spec.temporary,
            condition: spec.condition,
            enabled: true,
            ignore_count: spec.ignore_count,
            hit_count: 0,
        };
        self.files
            .entry(file)
            .or_default()
            .entry(spec.line)
            .or_default()
            .push(breakpoint.clone());
        breakpoint
    }

    /// Breakpoints at an exact line, in insertion order.
    pub fn find(&mut self, file: &str, line: u32) -> Vec<Breakpoint> {
        let key = self.canonicalize(file);
        self.at(&key, line).to_vec()
    }

    /// All breakpoints of one file ordered by line.
    pub fn breakpoints_in(&mut self, file: &str) -> Vec<Breakpoint> {
        let key = self.canonicalize(file);
        self.files
            .get(&key)
            .map(|lines| lines.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether any breakpoint exists anywhere in `file`.
    pub fn has_file(&mut self, file: &str) -> bool {
        let key = self.canonicalize(file);
        self.files
            .get(&key)
            .is_some_and(|lines| lines.values().any(|list| !list.is_empty()))
    }

    /// Delete one breakpoint by id.
    pub fn remove(&mut self, id: u32) -> Option<Breakpoint> {
        let mut removed = None;
        for lines in self.files.values_mut() {
            for list in lines.values_mut() {
                if let Some(pos) = list.iter().position(|bp| bp.id == id) {
                    removed = Some(list.remove(pos));
                    break;
                }
            }
            if removed.is_some() {
                lines.retain(|_, list| !list.is_empty());
                break;
            }
        }
        self.files.retain(|_, lines| !lines.is_empty());
        removed
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn at(&self, key: &str, line: u32) -> &[Breakpoint] {
        self.files
            .get(key)
            .and_then(|lines| lines.get(&line))
            .map_or(&[], Vec::as_slice)
    }

    /// Line whose breakpoints apply: the exact line, else the function's first line when
    /// `function_level` is set.
    pub(crate) fn effective_line(
        &self,
        key: &str,
        line: u32,
        first_line: u32,
        function_level: bool,
    ) -> Option<u32> {
        if !self.at(key, line).is_empty() {
            return Some(line);
        }
        (function_level && !self.at(key, first_line).is_empty()).then_some(first_line)
    }

    /// Enabled entries at a line as `(id, condition)` pairs.
    pub(crate) fn enabled_at(&self, key: &str, line: u32) -> Vec<(u32, Option<String>)> {
        self.at(key, line)
            .iter()
            .filter(|bp| bp.enabled)
            .map(|bp| (bp.id, bp.condition.clone()))
            .collect()
    }

    pub(crate) fn get(&self, key: &str, line: u32, id: u32) -> Option<Breakpoint> {
        self.at(key, line).iter().find(|bp| bp.id == id).cloned()
    }

    fn get_mut(&mut self, key: &str, line: u32, id: u32) -> Option<&mut Breakpoint> {
        self.files
            .get_mut(key)
            .and_then(|lines| lines.get_mut(&line))
            .and_then(|list| list.iter_mut().find(|bp| bp.id == id))
    }

    /// Count one evaluation pass. Returns false when the entry vanished meanwhile.
    pub(crate) fn record_hit(&mut self, key: &str, line: u32, id: u32) -> bool {
        match self.get_mut(key, line, id) {
            Some(bp) if bp.enabled => {
                bp.hit_count = bp.hit_count.saturating_add(1);
                true
            }
            _ => false,
        }
    }

    /// Apply ignore count and temporary deletion to a condition-true entry.
    pub(crate) fn resolve_hit(&mut self, key: &str, line: u32, id: u32) -> Option<Breakpoint> {
        let bp = self.get_mut(key, line, id)?;
        if bp.ignore_count > 0 {
            bp.ignore_count -= 1;
            return None;
        }
        let hit = bp.clone();
        if hit.temporary {
            self.remove(id);
        }
        Some(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_names_pass_through_and_paths_fold_case() {
        assert_eq!(canonical_path("<string>"), "<string>");
        let folded = canonical_path("Scripts/Main.SRC");
        assert!(folded.ends_with("scripts/main.src"), "{folded}");
        assert!(Path::new(folded.as_str()).is_absolute());
    }

    #[test]
    fn set_breakpoints_replaces_one_file_only() {
        let mut registry = BreakpointRegistry::new();
        registry.set_breakpoints("<a>", vec![BreakpointSpec::new(1), BreakpointSpec::new(2)]);
        registry.set_breakpoints("<b>", vec![BreakpointSpec::new(7)]);
        registry.set_breakpoints("<a>", vec![BreakpointSpec::new(3)]);
        assert!(registry.find("<a>", 1).is_empty());
        assert_eq!(registry.find("<a>", 3).len(), 1);
        assert_eq!(registry.find("<b>", 7).len(), 1);

        registry.set_breakpoints("<a>", Vec::new());
        assert!(!registry.has_file("<a>"));
        assert!(registry.has_file("<b>"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn ignore_count_and_temporary_resolution() {
        let mut registry = BreakpointRegistry::new();
        let bp = registry.add("<a>", BreakpointSpec::new(4).with_ignore_count(1).temporary());
        assert!(registry.record_hit("<a>", 4, bp.id()));
        assert!(registry.resolve_hit("<a>", 4, bp.id()).is_none());
        assert!(registry.record_hit("<a>", 4, bp.id()));
        let hit = registry.resolve_hit("<a>", 4, bp.id()).expect("effective breakpoint");
        assert_eq!(hit.hit_count, 2);
        assert!(registry.find("<a>", 4).is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn function_level_lookup_falls_back_to_first_line() {
        let mut registry = BreakpointRegistry::new();
        registry.add("<a>", BreakpointSpec::new(10));
        assert_eq!(registry.effective_line("<a>", 11, 10, true), Some(10));
        assert_eq!(registry.effective_line("<a>", 11, 10, false), None);
        assert_eq!(registry.effective_line("<a>", 10, 10, false), Some(10));
    }

    #[test]
    fn blank_condition_means_unconditional() {
        let spec = BreakpointSpec::new(1).with_condition("  ");
        assert_eq!(spec.condition, None);
    }
}
