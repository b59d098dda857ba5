use ircrelay::relay::PresenceProvider;
use parking_lot::Mutex;

/// Players currently logged in on the console game server, in login order.
#[derive(Debug, Default)]
pub struct PlayerRoster {
    players: Mutex<Vec<String>>,
}

impl PlayerRoster {
    /// Returns `false` if someone with that name (ignoring case) is already
    /// online.
    pub fn add(&self, name: &str) -> bool {
        let mut players = self.players.lock();
        if players.iter().any(|p| p.eq_ignore_ascii_case(name)) {
            return false;
        }
        players.push(name.to_string());
        true
    }

    /// Remove a player, returning the name as it was logged in.
    pub fn remove(&self, name: &str) -> Option<String> {
        let mut players = self.players.lock();
        let idx = players.iter().position(|p| p.eq_ignore_ascii_case(name))?;
        Some(players.remove(idx))
    }

    pub fn list(&self) -> Vec<String> {
        self.players.lock().clone()
    }
}

impl PresenceProvider for PlayerRoster {
    fn online_players(&self) -> Vec<String> {
        self.list()
    }
}
