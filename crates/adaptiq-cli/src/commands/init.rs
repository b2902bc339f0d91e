//! The `adaptiq init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create adaptiq.toml
    if std::path::Path::new("adaptiq.toml").exists() {
        println!("adaptiq.toml already exists, skipping.");
    } else {
        std::fs::write("adaptiq.toml", SAMPLE_CONFIG)?;
        println!("Created adaptiq.toml");
    }

    // Create sample corpus
    std::fs::create_dir_all("corpus")?;
    let sample_path = std::path::Path::new("corpus/sample.toml");
    if sample_path.exists() {
        println!("corpus/sample.toml already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_CORPUS)?;
        println!("Created corpus/sample.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: adaptiq validate --corpus corpus/sample.toml");
    println!("  2. Run: adaptiq quiz --user me --grade 5 --exam MCAS");
    println!("  3. Run: adaptiq simulate --corpus corpus --grade 5 --exam MCAS --seed 7");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# adaptiq configuration

data_dir = "./adaptiq-data"
corpus = "corpus"

[similarity]
type = "lexical"

# [similarity]
# type = "ollama"
# base_url = "http://localhost:11434"
# model = "nomic-embed-text"

# [similarity]
# type = "openai"
# api_key = "${OPENAI_API_KEY}"

[scoring]
grade = 1.0
last_difficulty = 1.0
accuracy = 1.0
text = 100.0
exam = 1.0

[engine]
similarity_timeout_ms = 2000
similarity_concurrency = 8
exhaustion = "fail"
"#;

const SAMPLE_CORPUS: &str = r#"[corpus]
id = "sample"
name = "Sample Science"
description = "A few elementary science questions to get started"

[[questions]]
id = "MCAS_2005_5_1"
text = "Which of these animals is a mammal? (A) shark (B) whale (C) trout (D) eel"
answer = "B"
grade = 5
exam = "MCAS"

[[questions]]
id = "MCAS_2006_5_4"
text = "Which form of energy does a plant use to make food? (A) sound (B) heat (C) light (D) electrical"
answer = "C"
grade = 5
exam = "MCAS"

[[questions]]
id = "TAKS_2009_8_12"
text = "At sea level, pure water boils at"
options = { A = "50 degrees Celsius", B = "75 degrees Celsius", C = "100 degrees Celsius", D = "150 degrees Celsius" }
answer = "C"
grade = 8
exam = "TAKS"

[[questions]]
id = "FCAT_2008_4_7"
text = "Which tool is best for measuring the mass of a rock? (1) ruler (2) balance (3) thermometer (4) graduated cylinder"
answer = "B"
grade = 4
exam = "FCAT"
"#;
