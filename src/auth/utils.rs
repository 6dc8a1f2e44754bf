//! Authentication utility functions.

use rand::prelude::RngExt;
use rand::rng;

/// Generate a film-themed display name for accounts created without one, e.g. "Noir Projectionist 4729".
pub fn generate_random_display_name() -> String {
    const ADJECTIVES: &[&str] = &[
        "Noir", "Silent", "Technicolor", "Widescreen", "Indie", "Cult", "Vintage", "Animated", "Surreal", "Epic",
        "Midnight", "Arthouse", "Golden", "Restored", "Directorial",
    ];

    const NOUNS: &[&str] = &[
        "Projectionist",
        "Critic",
        "Cinephile",
        "Auteur",
        "Usher",
        "Reel",
        "Montage",
        "Matinee",
        "Premiere",
        "Spectator",
        "Screenwriter",
        "Gaffer",
        "Storyboard",
        "Cameo",
        "Marquee",
    ];

    let mut rng = rng();
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.random_range(0..NOUNS.len())];
    let number = rng.random_range(1000..10000);

    format!("{adjective} {noun} {number}")
}
