use crate::commands::{CmdMessage, CmdResult, RecordEdit};
use crate::draft::Draft;
use crate::error::Result;
use crate::model::RoomCode;
use crate::remote::RecordRepository;
use crate::store::KeyValueStore;
use crate::sync::SyncStore;

/// Apply `edits` in order to a draft of `slug` and save it if anything changed.
/// A failing edit discards the whole draft.
pub fn run<K: KeyValueStore, R: RecordRepository>(
    store: &SyncStore<K, R>,
    room: &RoomCode,
    slug: &str,
    edits: Vec<RecordEdit>,
) -> Result<CmdResult> {
    let record = store.find(room, slug)?;
    let mut draft = Draft::begin(&record);
    for edit in edits {
        apply(&mut draft, edit)?;
    }

    let mut result = CmdResult::default();
    if !draft.is_dirty() {
        result.add_message(CmdMessage::info(format!("No changes to {}", slug)));
        return Ok(result.with_listed_records(vec![draft.cancel()]));
    }

    let saved = store.save(room, draft.finish())?;
    result.add_message(CmdMessage::success(format!("Saved {}", saved.slug)));
    Ok(result.with_affected_records(vec![saved]))
}

pub fn apply(draft: &mut Draft, edit: RecordEdit) -> Result<()> {
    match edit {
        RecordEdit::Title(title) => draft.set_title(title),
        RecordEdit::Summary(summary) => draft.set_summary(summary),
        RecordEdit::Tags(tags) => draft.set_tags(tags),
        RecordEdit::Theme(theme) => draft.set_theme(theme),
        RecordEdit::Note(note) => draft.set_note(note),
        RecordEdit::Story(story) => draft.set_story(story),
        RecordEdit::Hero(hero) => draft.set_hero_image(hero),
        RecordEdit::AddPhotos(sources) => draft.add_photos(sources),
        RecordEdit::RemovePhoto(index) => {
            draft.remove_photo(index)?;
        }
        RecordEdit::MovePhoto { from, to } => draft.move_photo(from, to)?,
        RecordEdit::Caption { index, caption } => draft.set_caption(index, caption)?,
        RecordEdit::Date { index, date } => draft.set_date(index, date)?,
    }
    Ok(())
}
