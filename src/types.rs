/// Dense, 1-based record identifier assigned upstream.
/// Example: `42`
pub type RecordId = u64;
/// CSV column name.
/// Examples: `comment3_text`, `comment1_solution_obj`
pub type ColumnName = String;
/// Cleaned phrase taking part in normalization.
/// Examples: `back button`, `increase font size`
pub type Phrase = String;
/// Dictionary base form of a word.
/// Examples: `enlarge`, `button`
pub type Lemma = String;
/// Free text exactly as it is looked up in an annotation store.
/// Example: `We can enlarge the back button.`
pub type AnnotatedText = String;
/// Dense word or phrase embedding.
pub type Vector = Vec<f32>;
