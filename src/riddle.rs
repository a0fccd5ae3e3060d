//! Vehicle riddles shown once the car has arrived.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::RiddleError;

/// Shown when a riddle has no entry in the answer table
pub const ANSWER_NOT_FOUND: &str = "こたえがわかりませんでした…";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Riddle {
    pub id: String,
    pub question: String,
}

/// The riddle pool plus an answer table keyed by riddle id
#[derive(Debug, Clone)]
pub struct RiddleBook {
    riddles: Vec<Riddle>,
    answers: HashMap<String, String>,
}

const BUILTIN: [(&str, &str, &str); 11] = [
    (
        "walking-driver",
        "きゅうきゅうしゃ の うんてんしゅさん が いっぽうつうこう の みち を はんたい に あるいていました。でも、おまわりさん は おこりません。なんで？",
        "うんてんじゃなくて あるいてたから！",
    ),
    (
        "fruit-truck",
        "ばなな と みかん を にだい に のせた とらっく が きゅうカーブ で なにか を おとしました。なんでしょう？",
        "スピード！",
    ),
    (
        "angel-rider",
        "てんし　が　のっている　のりもの　は　なーんだ？",
        "じてんしゃ！（じ「てんし」ゃ）",
    ),
    (
        "fire-at-koban",
        "119ばん　つうほう　を　うけた　しょうぼうしゃ　が　こうばん　で　とまったよ。なんでかな？",
        "こうばん　が　かじ　だったから！",
    ),
    (
        "get-off-first",
        "のるまえ　に　まずは　おりないと　いけない　のりもの　は　なーんだ？",
        "ちかてつ！",
    ),
    (
        "ten-ji",
        "「じじじじじじじじじじ　しゃ」　これは　なんの　のりものでしょう？",
        "じてんしゃ！",
    ),
    (
        "packed-tight",
        "「てん」を　つけると　ぎゅうぎゅうづめ　に　なってしまう　のりもの　なーんだ？",
        "きゅうきゅうしゃ！",
    ),
    (
        "up-and-down",
        "うえ　と　した　には　すすめるけど、まえ　と　うしろ　には　すすめない　のりもの　なーんだ？",
        "エレベーター！",
    ),
    (
        "moo-car",
        "モォ〜　となく　どうぶつが　のっている　くるまは　しょうぼうしゃ　と　パトカー　の　どっち？",
        "しょうぼうしゃ！（しょうぼ「うし」ゃ）",
    ),
    (
        "always-turning",
        "とまっている　ときも　うごいていないと　いけない　くるまは　なーんだ？",
        "ミキサーしゃ！（ミキサーを　くるくる　まわさないと　コンクリートが　かたまっちゃうよ！）",
    ),
    (
        "black-tongue",
        "べろが　まっくろな　のりもの　なーんだ？",
        "タンクローリー！（タンがクロ）",
    ),
];

#[derive(Deserialize)]
struct PackFile {
    riddles: Vec<PackEntry>,
}

#[derive(Deserialize)]
struct PackEntry {
    id: String,
    question: String,
    #[serde(default)]
    answer: Option<String>,
}

impl RiddleBook {
    pub fn builtin() -> Self {
        let riddles = BUILTIN
            .iter()
            .map(|(id, question, _)| Riddle {
                id: id.to_string(),
                question: question.to_string(),
            })
            .collect();
        let answers = BUILTIN
            .iter()
            .map(|(id, _, answer)| (id.to_string(), answer.to_string()))
            .collect();
        Self { riddles, answers }
    }

    /// Parse a pack like `{"riddles":[{"id":"..","question":"..","answer":".."}]}`.
    /// Entries without an answer stay in the pool and reveal the placeholder.
    pub fn from_json(data: &[u8]) -> Result<Self, RiddleError> {
        let pack: PackFile = serde_json::from_slice(data)?;
        if pack.riddles.is_empty() {
            return Err(RiddleError::EmptyPack);
        }

        let mut riddles = Vec::with_capacity(pack.riddles.len());
        let mut answers = HashMap::new();
        for entry in pack.riddles {
            if let Some(answer) = entry.answer {
                answers.insert(entry.id.clone(), answer);
            }
            riddles.push(Riddle {
                id: entry.id,
                question: entry.question,
            });
        }
        Ok(Self { riddles, answers })
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, RiddleError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| RiddleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data)
    }

    /// Load a custom pack, falling back to the built-in riddles
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        match path {
            None => Self::builtin(),
            Some(p) => match Self::from_json_file(p) {
                Ok(book) => {
                    tracing::info!(path = %p.display(), count = book.len(), "loaded riddle pack");
                    book
                }
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "using built-in riddles");
                    Self::builtin()
                }
            },
        }
    }

    pub fn riddles(&self) -> &[Riddle] {
        &self.riddles
    }

    pub fn len(&self) -> usize {
        self.riddles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.riddles.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Riddle> {
        self.riddles.iter().find(|r| r.id == id)
    }

    pub fn answer(&self, id: &str) -> &str {
        self.answers
            .get(id)
            .map(String::as_str)
            .unwrap_or(ANSWER_NOT_FOUND)
    }

    /// Uniform draw; repeats are allowed
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Riddle> {
        self.riddles.choose(rng)
    }
}

impl Default for RiddleBook {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A riddle book paired with its random source
#[derive(Debug)]
pub struct RiddlePicker {
    book: RiddleBook,
    rng: StdRng,
}

impl RiddlePicker {
    pub fn new(book: RiddleBook) -> Self {
        Self {
            book,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(book: RiddleBook, seed: u64) -> Self {
        Self {
            book,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn book(&self) -> &RiddleBook {
        &self.book
    }

    pub fn next_id(&mut self) -> Option<String> {
        self.book.pick(&mut self.rng).map(|r| r.id.clone())
    }
}
