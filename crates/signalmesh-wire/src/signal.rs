//! Signal codes used by this node.
//!
//! The full enumeration is a mesh-wide contract agreed out of band; the
//! transport cannot detect two services assigning the same code. Only the
//! subset this node emits or handles is listed here.
//!
//! `BUILD_STARTED = 0xC3` is the established mesh code. The remaining values
//! are this node's assumed assignments; confirm them against the mesh-wide
//! enumeration before talking to services that use a different table.

/// A 16-bit signal code.
pub type SignalCode = u16;

/// A build began on a managed server. Payload: `build_id`, `server_path`.
pub const BUILD_STARTED: SignalCode = 0xC3;

/// Request a full inspection of a build.
pub const INSPECTION_REQUESTED: SignalCode = 0xD0;

/// Inspection finished without blocking findings.
pub const INSPECTION_PASSED: SignalCode = 0xD1;

/// Inspection finished with blocking findings.
pub const INSPECTION_FAILED: SignalCode = 0xD2;

/// Request a lightweight inspection before a build starts.
pub const PRE_INSPECTION_REQUESTED: SignalCode = 0xD3;

/// Pre-inspection verdict.
pub const PRE_INSPECTION_COMPLETE: SignalCode = 0xD4;

/// Request validation of a skill definition.
pub const SKILL_VALIDATION_REQUESTED: SignalCode = 0xD5;

/// Request validation of a prompt.
pub const PROMPT_VALIDATION_REQUESTED: SignalCode = 0xD6;

/// A lesson was extracted from a failed inspection.
pub const LESSON_EXTRACTED: SignalCode = 0xE0;

const TABLE: [(SignalCode, &str); 9] = [
    (BUILD_STARTED, "BUILD_STARTED"),
    (INSPECTION_REQUESTED, "INSPECTION_REQUESTED"),
    (INSPECTION_PASSED, "INSPECTION_PASSED"),
    (INSPECTION_FAILED, "INSPECTION_FAILED"),
    (PRE_INSPECTION_REQUESTED, "PRE_INSPECTION_REQUESTED"),
    (PRE_INSPECTION_COMPLETE, "PRE_INSPECTION_COMPLETE"),
    (SKILL_VALIDATION_REQUESTED, "SKILL_VALIDATION_REQUESTED"),
    (PROMPT_VALIDATION_REQUESTED, "PROMPT_VALIDATION_REQUESTED"),
    (LESSON_EXTRACTED, "LESSON_EXTRACTED"),
];

/// Signals this node emits.
pub const EMITTED: [SignalCode; 4] = [
    INSPECTION_PASSED,
    INSPECTION_FAILED,
    PRE_INSPECTION_COMPLETE,
    LESSON_EXTRACTED,
];

/// Signals this node handles.
pub const RECEIVED: [SignalCode; 5] = [
    BUILD_STARTED,
    INSPECTION_REQUESTED,
    PRE_INSPECTION_REQUESTED,
    SKILL_VALIDATION_REQUESTED,
    PROMPT_VALIDATION_REQUESTED,
];

/// Returns a human-readable name for a signal code.
pub fn signal_name(code: SignalCode) -> &'static str {
    TABLE
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or("UNKNOWN")
}

/// Resolve a signal from its name (case-insensitive) or a numeric literal
/// (`195`, `0xC3`).
pub fn signal_from_name(input: &str) -> Option<SignalCode> {
    let input = input.trim();
    if let Some(hex) = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        return u16::from_str_radix(hex, 16).ok();
    }
    if let Ok(code) = input.parse::<u16>() {
        return Some(code);
    }
    TABLE
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case(input))
        .map(|(code, _)| *code)
}

/// All known signals as `(code, name)` pairs, in code order.
pub fn known_signals() -> impl Iterator<Item = (SignalCode, &'static str)> {
    TABLE.iter().copied()
}
