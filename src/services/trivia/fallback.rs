// src/services/trivia/fallback.rs

//! Local question bank served when the upstream cannot be used.

use rand::seq::SliceRandom;

use crate::models::question::TriviaQuestion;

struct Entry {
    category: &'static str,
    difficulty: &'static str,
    question: &'static str,
    correct: &'static str,
    incorrect: [&'static str; 3],
}

const BANK: &[Entry] = &[
    Entry {
        category: "General Knowledge",
        difficulty: "easy",
        question: "What is the capital city of France?",
        correct: "Paris",
        incorrect: ["Lyon", "Marseille", "Nice"],
    },
    Entry {
        category: "Science & Nature",
        difficulty: "easy",
        question: "What is the chemical symbol for gold?",
        correct: "Au",
        incorrect: ["Ag", "Gd", "Go"],
    },
    Entry {
        category: "Science & Nature",
        difficulty: "medium",
        question: "Which planet in our solar system has the most moons?",
        correct: "Saturn",
        incorrect: ["Jupiter", "Uranus", "Neptune"],
    },
    Entry {
        category: "Geography",
        difficulty: "easy",
        question: "Which is the largest ocean on Earth?",
        correct: "Pacific Ocean",
        incorrect: ["Atlantic Ocean", "Indian Ocean", "Arctic Ocean"],
    },
    Entry {
        category: "History",
        difficulty: "medium",
        question: "In which year did the Berlin Wall fall?",
        correct: "1989",
        incorrect: ["1987", "1991", "1985"],
    },
    Entry {
        category: "Entertainment: Books",
        difficulty: "easy",
        question: "Who wrote the novel \"1984\"?",
        correct: "George Orwell",
        incorrect: ["Aldous Huxley", "Ray Bradbury", "H. G. Wells"],
    },
    Entry {
        category: "Science: Mathematics",
        difficulty: "easy",
        question: "What is the square root of 144?",
        correct: "12",
        incorrect: ["14", "11", "16"],
    },
    Entry {
        category: "Science: Computers",
        difficulty: "medium",
        question: "What does \"CPU\" stand for?",
        correct: "Central Processing Unit",
        incorrect: [
            "Central Program Utility",
            "Computer Personal Unit",
            "Core Processing Unit",
        ],
    },
    Entry {
        category: "Animals",
        difficulty: "easy",
        question: "What is the largest mammal in the world?",
        correct: "Blue Whale",
        incorrect: ["African Elephant", "Giraffe", "Sperm Whale"],
    },
    Entry {
        category: "Art",
        difficulty: "easy",
        question: "Who painted the Mona Lisa?",
        correct: "Leonardo da Vinci",
        incorrect: ["Michelangelo", "Raphael", "Donatello"],
    },
    Entry {
        category: "Geography",
        difficulty: "hard",
        question: "What is the smallest country in the world by area?",
        correct: "Vatican City",
        incorrect: ["Monaco", "San Marino", "Liechtenstein"],
    },
    Entry {
        category: "Science & Nature",
        difficulty: "hard",
        question: "What is the hardest natural substance on Earth?",
        correct: "Diamond",
        incorrect: ["Quartz", "Corundum", "Topaz"],
    },
];

/// A fresh random selection of `count` questions from the bank, in random
/// order. Returns the whole bank when `count` exceeds its size.
pub fn fallback_questions(count: usize) -> Vec<TriviaQuestion> {
    let mut questions: Vec<TriviaQuestion> = BANK
        .iter()
        .map(|entry| TriviaQuestion {
            category: entry.category.to_string(),
            difficulty: entry.difficulty.to_string(),
            question: entry.question.to_string(),
            correct_answer: entry.correct.to_string(),
            incorrect_answers: entry.incorrect.iter().map(|s| s.to_string()).collect(),
        })
        .collect();

    questions.shuffle(&mut rand::rng());
    questions.truncate(count);
    questions
}

pub fn bank_size() -> usize {
    BANK.len()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn bank_is_larger_than_a_batch() {
        assert!(bank_size() > 10);
    }

    #[test]
    fn selection_has_requested_size_without_repeats() {
        let questions = fallback_questions(10);
        assert_eq!(questions.len(), 10);

        let distinct: HashSet<_> = questions.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(distinct.len(), 10);
        assert!(questions.iter().all(|q| q.incorrect_answers.len() == 3));
    }

    #[test]
    fn oversized_request_returns_whole_bank() {
        assert_eq!(fallback_questions(1000).len(), bank_size());
    }
}
