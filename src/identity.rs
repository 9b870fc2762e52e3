use chrono::Utc;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::common::{NewRecord, RecordKind};

pub const COLOR_PALETTE: [&str; 12] = [
    "#667eea", "#764ba2", "#f093fb", "#f5576c", "#4facfe", "#00f2fe", "#43e97b", "#38f9d7",
    "#fa709a", "#fee140", "#a8edea", "#fed6e3",
];

pub const NAMES: [&str; 12] = [
    "Blue User",
    "Green Friend",
    "Purple Pal",
    "Red Buddy",
    "Online Friend",
    "Anonymous",
    "Mystery User",
    "Chat Buddy",
    "Digital Friend",
    "Virtual Pal",
    "Cyber Mate",
    "Netizen",
];

pub const ADJECTIVES: [&str; 6] = ["Cheerful", "Friendly", "Relaxed", "Fun", "Cool", "Great"];

/// `user_<10 hex chars>_<unix millis>`. Only needs to tell this session apart
/// from others while the process runs.
pub fn generate_user_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut bytes = [0u8; 5];
    rng.fill(&mut bytes);
    format!(
        "user_{}_{}",
        hex::encode(bytes),
        Utc::now().timestamp_millis()
    )
}

pub fn pick_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    COLOR_PALETTE
        .choose(rng)
        .copied()
        .unwrap_or(COLOR_PALETTE[0])
        .to_string()
}

pub fn generate_display_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let name = NAMES.choose(rng).copied().unwrap_or(NAMES[0]);
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or(ADJECTIVES[0]);
    format!("{name} {adjective}")
}

/// Ephemeral identity of this client, built once at startup and shared by the
/// synchronizer and the composer. The display name is frozen for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub id: String,
    pub color: String,
    pub display_name: String,
}

impl SessionContext {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            id: generate_user_id(rng),
            color: pick_color(rng),
            display_name: generate_display_name(rng),
        }
    }

    pub fn is_own(&self, author_id: &str) -> bool {
        self.id == author_id
    }

    pub fn new_record(&self, text: String) -> NewRecord {
        NewRecord {
            text,
            author_id: self.id.clone(),
            display_name: self.display_name.clone(),
            color: self.color.clone(),
            kind: RecordKind::User,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn user_id_has_prefix_hex_and_millis() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = generate_user_id(&mut rng);
        let parts: Vec<&str> = id.split('_').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "user");
        assert_eq!(parts[1].len(), 10);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(parts[2].parse::<i64>().is_ok());
    }

    #[test]
    fn two_sessions_get_different_ids() {
        let mut rng = StdRng::seed_from_u64(1);
        let first = generate_user_id(&mut rng);
        let second = generate_user_id(&mut rng);
        assert_ne!(first, second);
    }

    #[test]
    fn color_comes_from_palette() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let color = pick_color(&mut rng);
            assert!(COLOR_PALETTE.contains(&color.as_str()));
        }
    }

    #[test]
    fn display_name_is_name_plus_adjective() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let display_name = generate_display_name(&mut rng);
            let matched = NAMES.iter().any(|name| {
                display_name
                    .strip_prefix(name)
                    .and_then(|rest| rest.strip_prefix(' '))
                    .is_some_and(|adjective| ADJECTIVES.contains(&adjective))
            });
            assert!(matched, "unexpected display name {display_name}");
        }
    }

    #[test]
    fn new_record_uses_frozen_identity() {
        let mut rng = StdRng::seed_from_u64(5);
        let session = SessionContext::generate(&mut rng);

        let first = session.new_record("one".to_string());
        let second = session.new_record("two".to_string());

        assert_eq!(first.display_name, second.display_name);
        assert_eq!(first.author_id, session.id);
        assert_eq!(first.color, session.color);
        assert_eq!(first.kind, RecordKind::User);
        assert!(session.is_own(&first.author_id));
        assert!(!session.is_own("user_other"));
    }
}
