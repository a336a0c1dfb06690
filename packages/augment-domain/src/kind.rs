use std::cmp::Ordering;

use regex::Regex;

const KIND_WITH_MAJOR_PATTERN: &str = r"^[A-Za-z0-9_\-\.\*]+:[A-Za-z0-9_\-\.\*]+:[A-Za-z0-9_\-\.\*]+:\d+\.$";

/// Splits `authority:source:entityType:version` into its prefix and version.
fn split_version(kind: &str) -> Option<(&str, &str)> {
	let index = kind.rfind(':')?;

	if kind[..index].matches(':').count() != 2 {
		return None;
	}

	Some((&kind[..index], &kind[index + 1..]))
}

/// Returns `authority:source:entityType:major.` for any kind, kind-with-major or kind pattern.
pub fn kind_with_major(kind: &str) -> Option<String> {
	let (prefix, version) = split_version(kind.trim())?;
	let major = version.split('.').next().unwrap_or_default();

	if major.is_empty() {
		return None;
	}

	Some(format!("{prefix}:{major}."))
}

pub fn is_kind_with_major(code: &str) -> bool {
	Regex::new(KIND_WITH_MAJOR_PATTERN).map(|re| re.is_match(code)).unwrap_or(false)
}

/// A concrete kind carries exactly three version components.
pub fn is_concrete_kind(kind: &str) -> bool {
	let Some((_, version)) = split_version(kind) else {
		return false;
	};
	let parts = version.split('.').collect::<Vec<_>>();

	parts.len() == 3 && parts.iter().all(|part| !part.is_empty() && part.parse::<u64>().is_ok())
}

pub fn has_same_major_kind(left: &str, right: &str) -> bool {
	match (kind_with_major(left), kind_with_major(right)) {
		(Some(left), Some(right)) => left == right,
		_ => false,
	}
}

/// Kind expression to hand to the search service: concrete kinds stay as is, everything else
/// becomes a prefix pattern.
pub fn search_kind(kind: &str) -> String {
	if is_concrete_kind(kind) || kind.ends_with('*') { kind.to_string() } else { format!("{kind}*") }
}

/// Glob match where `*` stands for any run of characters.
pub fn kind_matches(pattern: &str, kind: &str) -> bool {
	let mut parts = pattern.split('*');
	let Some(first) = parts.next() else {
		return pattern == kind;
	};

	if !kind.starts_with(first) {
		return false;
	}

	let mut rest = &kind[first.len()..];
	let tail = parts.collect::<Vec<_>>();

	if tail.is_empty() {
		return rest.is_empty();
	}

	for (index, part) in tail.iter().enumerate() {
		let last = index + 1 == tail.len();

		if last {
			return rest.ends_with(part);
		}

		match rest.find(part) {
			Some(position) => rest = &rest[position + part.len()..],
			None => return false,
		}
	}

	true
}

/// Orders concrete kinds by their numeric `major.minor.patch` version.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
	version_triplet(left).cmp(&version_triplet(right))
}

pub fn strip_id_postfix(id: &str) -> &str {
	id.strip_suffix(':').unwrap_or(id)
}

fn version_triplet(kind: &str) -> Option<(u64, u64, u64)> {
	let (_, version) = split_version(kind)?;
	let mut parts = version.split('.').map(|part| part.parse::<u64>().ok());

	Some((parts.next()??, parts.next()??, parts.next()??))
}
