// Table and constraint names of the managed store. Datastore errors carry
// these names the same way the database reports them.

pub const ENTRIES_TABLE: &str = "entries";

pub const GIVEAWAYS_SLUG_KEY: &str = "giveaways_slug_key";
pub const ENTRIES_PARTICIPANT_KEY: &str = "entries_giveaway_id_participant_name_key";
pub const ENTRIES_GIVEAWAY_FKEY: &str = "entries_giveaway_id_fkey";
