//! Cache key layout.
//!
//! The `{...}` segment is the cluster hash tag: all keys of one player hash
//! to the same slot, so single-player pipelines are legal on a cluster.

pub fn online(uuid: &str) -> String {
    format!("online:{{{uuid}}}:")
}

pub fn playtime(uuid: &str) -> String {
    format!("playtime:{{{uuid}}}:")
}

pub fn delta(uuid: &str) -> String {
    format!("deltatime:{{{uuid}}}:")
}

pub fn player_team(uuid: &str) -> String {
    format!("team:{{{uuid}}}:")
}

pub fn banned(uuid: &str) -> String {
    format!("banned:{{{uuid}}}:")
}

pub fn ban_reason(uuid: &str) -> String {
    format!("ban_reason:{{{uuid}}}:")
}

pub fn team_total(team: &str) -> String {
    format!("team_total_playtime:{{{team}}}:")
}

pub fn online_pattern() -> &'static str {
    "online:{*}:"
}

pub fn playtime_pattern() -> &'static str {
    "playtime:{*}:"
}

pub fn banned_pattern() -> &'static str {
    "banned:{*}:"
}

/// Extract the hash-tag payload (player uuid or team id) from a key.
pub fn tag_from_key(key: &str) -> Option<&str> {
    let start = key.find('{')?;
    let end = key.find('}')?;
    (end > start + 1).then(|| &key[start + 1..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "00000000-0000-0000-0000-000000000001";

    #[test]
    fn per_player_keys_share_the_hash_tag() {
        for key in [
            online(UUID),
            playtime(UUID),
            delta(UUID),
            player_team(UUID),
            banned(UUID),
            ban_reason(UUID),
        ] {
            assert_eq!(tag_from_key(&key), Some(UUID));
        }
    }

    #[test]
    fn team_total_key_carries_the_team_tag() {
        let key = team_total("AQUA_CREEPERS");
        assert_eq!(key, "team_total_playtime:{AQUA_CREEPERS}:");
        assert_eq!(tag_from_key(&key), Some("AQUA_CREEPERS"));
    }

    #[test]
    fn malformed_keys_yield_no_tag() {
        assert_eq!(tag_from_key("online:broken"), None);
        assert_eq!(tag_from_key("online:{}:"), None);
        assert_eq!(tag_from_key("online:}{:"), None);
    }
}
