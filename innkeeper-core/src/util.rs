use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Length of the opaque tokens handed out at login
const SESSION_TOKEN_LENGTH: usize = 32;

/// Generates a fresh session token
pub fn session_token() -> String {
    thread_rng()
        .sample_iter(Alphanumeric)
        .take(SESSION_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
