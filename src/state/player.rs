use super::AppState;
use crate::types::*;
use rand::Rng;

/// Safe character set for short codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;
const MAX_DISPLAY_NAME_CHARS: usize = 32;

/// Generate a random short code (5 characters)
fn generate_short_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Trimmed and shortened name, or a generated one when blank
fn display_name_or_generated(requested: Option<String>) -> String {
    requested
        .map(|name| {
            name.trim()
                .chars()
                .take(MAX_DISPLAY_NAME_CHARS)
                .collect::<String>()
        })
        .filter(|name| !name.is_empty())
        .or_else(|| petname::petname(2, " "))
        .unwrap_or_else(|| "Player".to_string())
}

impl AppState {
    /// Create a new player with a short reconnect code
    pub async fn create_player(&self, display_name: Option<String>) -> Player {
        let mut players = self.players.write().await;
        let token = loop {
            let code = generate_short_code();
            if !players.values().any(|p| p.token == code) {
                break code;
            }
        };

        let player = Player {
            id: ulid::Ulid::new().to_string(),
            token,
            display_name: display_name_or_generated(display_name),
            overall_score: 0,
        };
        tracing::info!("Player {} joined as {}", player.id, player.display_name);
        players.insert(player.id.clone(), player.clone());
        player
    }

    pub async fn get_player(&self, player_id: &PlayerId) -> Option<Player> {
        self.players.read().await.get(player_id).cloned()
    }

    /// Get player by token
    pub async fn get_player_by_token(&self, token: &str) -> Option<Player> {
        self.players
            .read()
            .await
            .values()
            .find(|p| p.token == token)
            .cloned()
    }

    /// All players ordered by join time
    pub async fn list_players(&self) -> Vec<Player> {
        let mut players: Vec<Player> = self.players.read().await.values().cloned().collect();
        // ULIDs sort by creation time
        players.sort_by(|a, b| a.id.cmp(&b.id));
        players
    }

    /// Add one overall point to each winner
    pub async fn award_points(&self, winners: &[PlayerId]) {
        let mut players = self.players.write().await;
        for id in winners {
            match players.get_mut(id) {
                Some(player) => {
                    player.overall_score += 1;
                    tracing::info!(
                        "{} now has {} overall points",
                        player.display_name,
                        player.overall_score
                    );
                }
                None => tracing::warn!("Cannot award point to unknown player {}", id),
            }
        }
    }
}
