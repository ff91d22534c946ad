use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Universal part-of-speech tag.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PosTag {
    Adj,
    Adp,
    Adv,
    Aux,
    Cconj,
    Det,
    Intj,
    Noun,
    Num,
    Part,
    Pron,
    Propn,
    Punct,
    Sconj,
    Sym,
    Verb,
    Space,
    X,
}

impl PosTag {
    /// `NOUN` or `PROPN`.
    pub fn is_nominal(self) -> bool {
        matches!(self, PosTag::Noun | PosTag::Propn)
    }

    /// `VERB` or `AUX`.
    pub fn is_verbal(self) -> bool {
        matches!(self, PosTag::Verb | PosTag::Aux)
    }
}

impl FromStr for PosTag {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let tag = match raw.to_ascii_uppercase().as_str() {
            "ADJ" => PosTag::Adj,
            "ADP" => PosTag::Adp,
            "ADV" => PosTag::Adv,
            "AUX" => PosTag::Aux,
            "CCONJ" | "CONJ" => PosTag::Cconj,
            "DET" => PosTag::Det,
            "INTJ" => PosTag::Intj,
            "NOUN" => PosTag::Noun,
            "NUM" => PosTag::Num,
            "PART" => PosTag::Part,
            "PRON" => PosTag::Pron,
            "PROPN" => PosTag::Propn,
            "PUNCT" => PosTag::Punct,
            "SCONJ" => PosTag::Sconj,
            "SYM" => PosTag::Sym,
            "VERB" => PosTag::Verb,
            "SPACE" => PosTag::Space,
            "X" => PosTag::X,
            other => return Err(format!("unknown part-of-speech tag '{other}'")),
        };
        Ok(tag)
    }
}

/// Dependency relation between a token and its head.
///
/// Labels follow the English ClearNLP scheme; the Universal Dependencies
/// spellings `root`, `obj` and `nsubj:pass` are folded into their
/// ClearNLP counterparts.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DepLabel {
    Root,
    Nsubj,
    NsubjPass,
    Dobj,
    Attr,
    Xcomp,
    Ccomp,
    Prep,
    Pobj,
    Pcomp,
    Conj,
    Dative,
    Appos,
    Oprd,
    Other(String),
}

impl DepLabel {
    /// Parse a raw label; never fails, unrecognised labels become [`DepLabel::Other`].
    pub fn parse(raw: &str) -> Self {
        match raw {
            "ROOT" | "root" => DepLabel::Root,
            "nsubj" => DepLabel::Nsubj,
            "nsubjpass" | "nsubj:pass" => DepLabel::NsubjPass,
            "dobj" | "obj" => DepLabel::Dobj,
            "attr" => DepLabel::Attr,
            "xcomp" => DepLabel::Xcomp,
            "ccomp" => DepLabel::Ccomp,
            "prep" => DepLabel::Prep,
            "pobj" => DepLabel::Pobj,
            "pcomp" => DepLabel::Pcomp,
            "conj" => DepLabel::Conj,
            "dative" => DepLabel::Dative,
            "appos" => DepLabel::Appos,
            "oprd" => DepLabel::Oprd,
            other => DepLabel::Other(other.to_string()),
        }
    }

    /// Subject relations.
    pub fn is_subject(&self) -> bool {
        matches!(self, DepLabel::Nsubj | DepLabel::NsubjPass)
    }

    /// Relations treated as a direct object of the verb.
    pub fn is_direct_object(&self) -> bool {
        matches!(self, DepLabel::Dobj | DepLabel::Attr)
    }

    /// Relations that head a base noun phrase.
    fn is_np_head(&self) -> bool {
        matches!(
            self,
            DepLabel::Oprd
                | DepLabel::Nsubj
                | DepLabel::Dobj
                | DepLabel::NsubjPass
                | DepLabel::Pcomp
                | DepLabel::Pobj
                | DepLabel::Dative
                | DepLabel::Appos
                | DepLabel::Attr
                | DepLabel::Root
        )
    }
}

impl fmt::Display for DepLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DepLabel::Root => "ROOT",
            DepLabel::Nsubj => "nsubj",
            DepLabel::NsubjPass => "nsubjpass",
            DepLabel::Dobj => "dobj",
            DepLabel::Attr => "attr",
            DepLabel::Xcomp => "xcomp",
            DepLabel::Ccomp => "ccomp",
            DepLabel::Prep => "prep",
            DepLabel::Pobj => "pobj",
            DepLabel::Pcomp => "pcomp",
            DepLabel::Conj => "conj",
            DepLabel::Dative => "dative",
            DepLabel::Appos => "appos",
            DepLabel::Oprd => "oprd",
            DepLabel::Other(other) => other,
        };
        f.write_str(label)
    }
}

/// One token of a parsed document.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    /// Position in the document (0-based, across sentences).
    pub index: usize,
    /// Surface form.
    pub text: String,
    /// Dictionary base form.
    pub lemma: String,
    /// Universal POS tag.
    pub pos: PosTag,
    /// Relation to `head`.
    pub dep: DepLabel,
    /// Governor position; `None` for sentence roots.
    pub head: Option<usize>,
}

/// A dependency-parsed document: tokens in order plus child adjacency.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Doc {
    tokens: Vec<Token>,
    children: Vec<Vec<usize>>,
}

impl Doc {
    /// Build a document, re-indexing tokens and deriving the child lists.
    ///
    /// Heads pointing outside the document are treated as roots.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        let len = tokens.len();
        let mut children = vec![Vec::new(); len];
        for (idx, token) in tokens.iter_mut().enumerate() {
            token.index = idx;
            match token.head {
                Some(head) if head < len && head != idx => children[head].push(idx),
                _ => token.head = None,
            }
        }
        Self { tokens, children }
    }

    /// All tokens in document order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Token at `index`; panics when out of range.
    pub fn token(&self, index: usize) -> &Token {
        &self.tokens[index]
    }

    /// Token count.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Direct dependents of `index`, in document order.
    pub fn children(&self, index: usize) -> impl Iterator<Item = &Token> + '_ {
        self.children[index].iter().map(move |&child| &self.tokens[child])
    }

    /// `index` and all of its descendants, in document order.
    pub fn subtree(&self, index: usize) -> Vec<usize> {
        let mut collected = Vec::new();
        let mut seen = vec![false; self.tokens.len()];
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            if std::mem::replace(&mut seen[current], true) {
                continue;
            }
            collected.push(current);
            stack.extend(self.children[current].iter().copied());
        }
        collected.sort_unstable();
        collected
    }

    /// Leftmost token of the subtree rooted at `index`.
    pub fn left_edge(&self, index: usize) -> usize {
        self.subtree(index).first().copied().unwrap_or(index)
    }

    /// First sentence root, if any, satisfying `accept`.
    pub fn find_root<P>(&self, accept: P) -> Option<&Token>
    where
        P: Fn(&Token) -> bool,
    {
        self.tokens
            .iter()
            .find(|token| token.dep == DepLabel::Root && accept(token))
    }

    /// Replace the surface form of `index`.
    pub fn set_text(&mut self, index: usize, text: String) {
        self.tokens[index].text = text;
    }

    /// Surface forms of `indices` joined by single spaces.
    pub fn join_text(&self, indices: &[usize]) -> String {
        indices
            .iter()
            .map(|&idx| self.tokens[idx].text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Base noun phrases inside `span`, as (token range, root) pairs.
    ///
    /// The token heading the span is treated as a root even when its label in
    /// the full document is not, so phrases cut from a larger parse chunk the
    /// same way as if parsed on their own.
    pub fn noun_chunks(&self, span: &[usize]) -> Vec<(Range<usize>, usize)> {
        let mut chunks = Vec::new();
        let mut prev_end: Option<usize> = None;
        for &idx in span {
            let word = &self.tokens[idx];
            if !matches!(word.pos, PosTag::Noun | PosTag::Propn | PosTag::Pron) {
                continue;
            }
            let left = self.left_edge_within(idx, span);
            if prev_end.is_some_and(|end| left <= end) {
                continue;
            }
            let heads_np = if self.span_label(idx, span).is_np_head() {
                true
            } else if word.dep == DepLabel::Conj {
                let mut head = idx;
                while let Some(parent) = self.tokens[head].head.filter(|&p| span.contains(&p)) {
                    if self.tokens[head].dep == DepLabel::Conj && parent < head {
                        head = parent;
                    } else {
                        break;
                    }
                }
                self.span_label(head, span).is_np_head()
            } else {
                false
            };
            if heads_np {
                prev_end = Some(idx);
                chunks.push((left..idx + 1, idx));
            }
        }
        chunks
    }

    fn span_label(&self, idx: usize, span: &[usize]) -> DepLabel {
        let token = &self.tokens[idx];
        match token.head {
            Some(head) if span.contains(&head) => token.dep.clone(),
            _ => DepLabel::Root,
        }
    }

    fn left_edge_within(&self, idx: usize, span: &[usize]) -> usize {
        self.subtree(idx)
            .into_iter()
            .find(|member| span.contains(member))
            .unwrap_or(idx)
    }
}

/// Shorthand used by tests and in-memory fixtures.
pub fn token(text: &str, lemma: &str, pos: PosTag, dep: &str, head: Option<usize>) -> Token {
    Token {
        index: 0,
        text: text.to_string(),
        lemma: lemma.to_string(),
        pos,
        dep: DepLabel::parse(dep),
        head,
    }
}
