use crate::commands::{CmdMessage, CmdResult};
use crate::error::Result;
use crate::messages::MessageBoard;
use crate::store::KeyValueStore;

pub fn show<K: KeyValueStore>(board: &MessageBoard<K>) -> Result<CmdResult> {
    Ok(CmdResult::default().with_message_pair(board.load()))
}

/// Replace one or both messages. Blank input leaves that message unchanged.
pub fn set<K: KeyValueStore>(
    board: &MessageBoard<K>,
    first: Option<String>,
    second: Option<String>,
) -> Result<CmdResult> {
    let mut pair = board.load();
    let mut changed = false;
    for (slot, value) in [(&mut pair.first, first), (&mut pair.second, second)] {
        if let Some(text) = value.filter(|t| !t.trim().is_empty()) {
            *slot = text.trim().to_string();
            changed = true;
        }
    }

    let mut result = CmdResult::default();
    if changed {
        board.save(&pair)?;
        result.add_message(CmdMessage::success("Messages saved"));
    } else {
        result.add_message(CmdMessage::info("Nothing to change"));
    }
    Ok(result.with_message_pair(pair))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessagePair;
    use crate::store::memory::MemoryKv;

    #[test]
    fn set_one_keeps_the_other() {
        let board = MessageBoard::new(MemoryKv::new());
        set(&board, None, Some("  miss you ".into())).unwrap();

        let pair = show(&board).unwrap().message_pair.unwrap();
        assert_eq!(pair.first, MessagePair::default().first);
        assert_eq!(pair.second, "miss you");
    }

    #[test]
    fn blank_input_changes_nothing() {
        let board = MessageBoard::new(MemoryKv::new());
        let result = set(&board, Some("   ".into()), None).unwrap();
        assert_eq!(result.message_pair.unwrap(), MessagePair::default());
    }
}
