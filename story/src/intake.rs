//! Interactive story intake.
//!
//! Walks the user through building a [`StoryProfile`] with plain line-based
//! questions. Input and output are generic so the whole flow can be driven
//! from a script in tests.

use crate::error::AppError;
use rand::Rng;
use std::io::{self, BufRead, Write};
use story_core::profile::{DEFAULT_CHALLENGE, DEFAULT_MAGIC_SYSTEM, MAX_AGE, MIN_AGE};
use story_core::{
    Catalog, Character, Genre, HookStyle, MagicalCompanion, StoryError, StoryLength,
    StoryProfile, Tone,
};

/// Most characters one story can star.
pub const MAX_CHARACTERS: usize = 4;

const DEFAULT_PERSONALITY: &str = "curious and kind";
const DEFAULT_FAVORITES: &str = "exploring new places";

/// Line-oriented question and answer over any reader and writer.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, text: &str) -> Result<(), AppError> {
        writeln!(self.output, "{text}")?;
        Ok(())
    }

    /// Ask a question and return the trimmed answer. End of input is an error.
    pub fn ask(&mut self, question: &str) -> Result<String, AppError> {
        write!(self.output, "{question} ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed").into());
        }
        Ok(line.trim().to_string())
    }

    /// Ask with a default used for a blank answer.
    pub fn ask_or(&mut self, question: &str, default: &str) -> Result<String, AppError> {
        let answer = self.ask(&format!("{question} [{default}]"))?;
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }

    /// Ask until the answer is not blank.
    pub fn ask_required(&mut self, question: &str) -> Result<String, AppError> {
        loop {
            let answer = self.ask(question)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            self.say("  Please enter something.")?;
        }
    }

    /// Ask until the answer is an age the engine accepts.
    pub fn ask_age(&mut self, question: &str) -> Result<u32, AppError> {
        loop {
            let answer = self.ask(question)?;
            match answer.parse::<u32>() {
                Ok(age) if (MIN_AGE..=MAX_AGE).contains(&age) => return Ok(age),
                _ => self.say(&format!(
                    "  Please enter a number from {MIN_AGE} to {MAX_AGE}."
                ))?,
            }
        }
    }

    pub fn yes_no(&mut self, question: &str, default: bool) -> Result<bool, AppError> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let answer = self.ask(&format!("{question} ({hint})"))?.to_lowercase();
            match answer.as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say("  Please answer y or n.")?,
            }
        }
    }

    /// Show a numbered menu and return the chosen index.
    pub fn choose(
        &mut self,
        title: &str,
        options: &[String],
        default: usize,
    ) -> Result<usize, AppError> {
        self.say(&format!("\n{title}"))?;
        for (i, option) in options.iter().enumerate() {
            self.say(&format!("  {}. {option}", i + 1))?;
        }

        loop {
            let answer = self.ask(&format!("Choose 1-{} [{}]:", options.len(), default + 1))?;
            if answer.is_empty() {
                return Ok(default);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Ok(n - 1),
                _ => self.say("  That is not one of the choices.")?,
            }
        }
    }
}

/// Run the full intake and return the profile to generate.
pub fn collect_profile<R: BufRead, W: Write, G: Rng + ?Sized>(
    prompter: &mut Prompter<R, W>,
    saved: &[Character],
    catalog: &Catalog,
    rng: &mut G,
) -> Result<StoryProfile, AppError> {
    prompter.say("--- Welcome to the Magical Story Creator! ---")?;

    let characters = collect_characters(prompter, saved)?;
    let mut profile = StoryProfile::new(characters);

    profile.genre = choose_option(prompter, "What kind of story?", Genre::all(), |g| {
        format!("{} - {}", g.name(), g.description())
    })?;
    profile.tone = choose_option(prompter, "How should it feel?", Tone::all(), |t| {
        format!("{} - {}", t.name(), t.description())
    })?;
    profile.length = choose_option(prompter, "How long?", StoryLength::all(), |l| {
        format!("{} - {}", l.name(), l.description())
    })?;
    profile.hook = choose_option(prompter, "How should it begin?", HookStyle::all(), |h| {
        match h {
            HookStyle::Action => "Right in the middle of the action".to_string(),
            HookStyle::Description => "With a picture of where it happens".to_string(),
        }
    })?;

    prompter.say("")?;
    profile.challenge = prompter.ask_or(
        "What challenge are the heroes facing (e.g. 'being shy', 'making friends')?",
        DEFAULT_CHALLENGE,
    )?;
    profile.magic_system = prompter.ask_or("How does magic work in this world?", DEFAULT_MAGIC_SYSTEM)?;

    profile.companion = choose_companion(prompter, catalog, rng)?;

    if prompter.yes_no("\nAdd a surprise plot twist?", false)? {
        profile.twist = catalog.random_twist(rng).map(str::to_string);
    }

    Ok(profile)
}

fn collect_characters<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    saved: &[Character],
) -> Result<Vec<Character>, AppError> {
    let mut characters: Vec<Character> = Vec::new();

    loop {
        let reuse = !saved.is_empty()
            && prompter.yes_no(
                &format!("\nUse one of your {} saved characters?", saved.len()),
                false,
            )?;

        let character = if reuse {
            let options: Vec<String> = saved
                .iter()
                .map(|c| format!("{} (age {}) - {}", c.name(), c.age(), c.personality()))
                .collect();
            let index = prompter.choose("Saved characters:", &options, 0)?;
            saved[index].clone()
        } else {
            create_character(prompter)?
        };

        if characters.iter().any(|c| c.name() == character.name()) {
            prompter.say(&format!("  {} is already in this story.", character.name()))?;
        } else {
            characters.push(character);
        }

        if characters.len() >= MAX_CHARACTERS
            || (!characters.is_empty() && !prompter.yes_no("Add another character?", false)?)
        {
            return Ok(characters);
        }
    }
}

fn create_character<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
) -> Result<Character, AppError> {
    let name = prompter.ask_required("\nWhat is the character's name?")?;
    let age = prompter.ask_age(&format!("How old is {name}?"))?;
    let gender = prompter.ask(&format!("Is {name} a boy, a girl, or something else? (optional)"))?;
    let personality = prompter.ask_or(&format!("Describe {name} in a few words"), DEFAULT_PERSONALITY)?;
    let favorites = prompter.ask_or(&format!("What does {name} love?"), DEFAULT_FAVORITES)?;
    let special_trait = prompter.ask(&format!("Anything special about {name}? (optional)"))?;

    let character = Character::new(name, age, personality, favorites)
        .map_err(StoryError::from)?
        .with_gender(gender)
        .with_special_trait(special_trait);
    Ok(character)
}

fn choose_option<T: Copy, R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    title: &str,
    options: &[T],
    describe: impl Fn(&T) -> String,
) -> Result<T, AppError> {
    let labels: Vec<String> = options.iter().map(describe).collect();
    let index = prompter.choose(title, &labels, 0)?;
    Ok(options[index])
}

fn choose_companion<R: BufRead, W: Write, G: Rng + ?Sized>(
    prompter: &mut Prompter<R, W>,
    catalog: &Catalog,
    rng: &mut G,
) -> Result<Option<MagicalCompanion>, AppError> {
    let companions = catalog.companions();

    let mut options = vec!["No companion".to_string()];
    options.extend(companions.iter().map(MagicalCompanion::label));
    options.push("Surprise me!".to_string());
    options.push("Make my own".to_string());

    let index = prompter.choose("Pick a magical companion:", &options, 0)?;
    let surprise = companions.len() + 1;

    Ok(match index {
        0 => None,
        i if i <= companions.len() => Some(companions[i - 1].clone()),
        i if i == surprise => catalog.random_companion(rng).cloned(),
        _ => Some(custom_companion(prompter)?),
    })
}

fn custom_companion<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
) -> Result<MagicalCompanion, AppError> {
    let species = prompter.ask_required(
        "What kind of magical companion (e.g. 'a talking squirrel', 'a tiny robot')?",
    )?;
    let name = prompter.ask_required("What is the companion's name?")?;

    Ok(MagicalCompanion {
        name,
        emoji: "✨".to_string(),
        species,
        appearance: "a friendly, twinkling glow".to_string(),
        personality: "loyal and encouraging".to_string(),
        quirk: "hums a happy tune when things go well".to_string(),
        special_ability: "always knows when a friend needs help".to_string(),
    })
}
