use rand::seq::SliceRandom;

#[derive(Clone)]
pub struct Insults(Vec<&'static str>);

impl Insults {
    pub fn new() -> Self {
        Insults(make_insults())
    }

    pub fn pick(&self) -> &'static str {
        self.0
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("Sorry, I don't feel like it")
    }

    #[cfg(test)]
    pub fn all(&self) -> &[&'static str] {
        &self.0
    }
}

impl Default for Insults {
    fn default() -> Self {
        Self::new()
    }
}

fn make_insults() -> Vec<&'static str> {
    vec![
        "You are basically a dog with a human body",
        "I wish you were just less of a turd",
        "Yeah, I mean, uh... you kinda suck",
        "Your mother was a hamster, and your father smelt of elderberries",
        "Sorry, I don't feel like it",
        "Um. No?",
        "You look like you got yeeted in the face by a lobster",
        "I didn't even know you were smart enough to speak!",
        "*sigh...* Why are you such a glutton for punishment?",
        "When you die in Warzone, your squad buys self-revive instead",
    ]
}
