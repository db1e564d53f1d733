#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum OutputMode { Truncate, Append }

#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct RedirectSpec {
	pub input: Option<String>,
	pub output: Option<(String, OutputMode)>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Command {
	pub argv: Vec<String>,
}

impl Command {
	pub fn name(&self) -> &str {
		&self.argv[0]
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Pipeline {
	pub commands: Vec<Command>,
	pub redirect: RedirectSpec,
	pub is_background: bool,
}

impl Pipeline {
	// Job text as shown by `jobs` and the completion notice.
	pub fn describe(&self) -> String {
		let mut parts: Vec<String> = Vec::new();
		for (i, command) in self.commands.iter().enumerate() {
			if i > 0 {
				parts.push("|".to_string());
			}
			parts.extend(command.argv.iter().cloned());
			if i == 0 {
				if let Some(ref input) = self.redirect.input {
					parts.push("<".to_string());
					parts.push(input.clone());
				}
			}
		}
		if let Some((ref path, mode)) = self.redirect.output {
			parts.push(match mode { OutputMode::Truncate => ">", OutputMode::Append => ">>" }.to_string());
			parts.push(path.clone());
		}
		parts.join(" ")
	}
}
