use crate::error::SyntaxError;
use crate::types::*;

pub type ParseResult<T> = Result<T, SyntaxError>;

const DELIMITERS: &[char] = &[' ', '\t', '\r', '\n', '\x07'];

pub fn tokenize(line: &str) -> Vec<String> {
	line.split(DELIMITERS)
		.filter(|word| !word.is_empty())
		.map(String::from)
		.collect()
}

fn is_operator(token: &str) -> bool {
	match token {
		">" | ">>" | "<" | "|" | "&" => true,
		_ => false,
	}
}

struct Parser {
	tokens: Vec<String>,
}

impl Parser {
	fn take_target(&mut self, i: usize, op: &'static str) -> ParseResult<String> {
		match self.tokens.get(i + 1) {
			Some(target) if !is_operator(target) => {},
			_ => { return Err(SyntaxError::MissingTarget(op)); },
		}
		let mut removed = self.tokens.drain(i .. i + 2);
		removed.next();
		Ok(removed.next().unwrap_or_default())
	}

	fn strip_redirects(&mut self) -> ParseResult<RedirectSpec> {
		let mut redirect = RedirectSpec::default();
		let mut i = 0;
		while i < self.tokens.len() {
			let (op, mode): (&'static str, Option<OutputMode>) = match self.tokens[i].as_str() {
				">" => (">", Some(OutputMode::Truncate)),
				">>" => (">>", Some(OutputMode::Append)),
				"<" => ("<", None),
				_ => { i += 1; continue; },
			};
			let target = self.take_target(i, op)?;
			match mode {
				Some(mode) => {
					if redirect.output.is_some() {
						return Err(SyntaxError::DuplicateRedirect("output"));
					}
					redirect.output = Some((target, mode));
				},
				None => {
					if redirect.input.is_some() {
						return Err(SyntaxError::DuplicateRedirect("input"));
					}
					redirect.input = Some(target);
				},
			}
		}
		Ok(redirect)
	}

	fn strip_background(&mut self) -> bool {
		if self.tokens.last().map(String::as_str) == Some("&") {
			self.tokens.pop();
			true
		} else {
			false
		}
	}

	fn split_pipes(self) -> ParseResult<Vec<Command>> {
		let mut commands: Vec<Command> = vec![];
		let mut argv: Vec<String> = vec![];
		for token in self.tokens {
			match token.as_str() {
				"|" => {
					if argv.is_empty() {
						return Err(SyntaxError::EmptyCommand);
					}
					commands.push(Command { argv: std::mem::take(&mut argv) });
				},
				"&" => { return Err(SyntaxError::UnexpectedToken("&")); },
				_ => argv.push(token),
			}
		}
		if argv.is_empty() {
			return Err(SyntaxError::EmptyCommand);
		}
		commands.push(Command { argv: argv });
		Ok(commands)
	}
}

// Redirections and the trailing `&` are line-wide, so they are stripped
// before the line is cut into pipeline stages.
pub fn parse(tokens: Vec<String>) -> ParseResult<Pipeline> {
	let mut parser = Parser { tokens: tokens };
	let redirect = parser.strip_redirects()?;
	let is_background = parser.strip_background();
	let commands = parser.split_pipes()?;
	Ok(Pipeline { commands: commands, redirect: redirect, is_background: is_background })
}

#[cfg(test)]
mod tests {
	use super::*;

	fn words(line: &str) -> Vec<String> {
		tokenize(line)
	}

	fn argv(line: &str) -> Command {
		Command { argv: words(line) }
	}

	#[test]
	fn tokenize_splits_on_any_whitespace() {
		assert_eq!(tokenize("  ls\t-l \r\n"), vec!["ls", "-l"]);
		assert_eq!(tokenize("a\x07b"), vec!["a", "b"]);
		assert!(tokenize(" \t\n").is_empty());
	}

	#[test]
	fn plain_command_has_no_directives() {
		let pipeline = parse(words("grep -n foo bar.txt")).unwrap();
		assert_eq!(pipeline.redirect, RedirectSpec::default());
		assert!(!pipeline.is_background);
		assert_eq!(pipeline.commands, vec![argv("grep -n foo bar.txt")]);
	}

	#[test]
	fn reparsing_a_parsed_command_is_a_no_op() {
		let first = parse(words("sort -r < in.txt > out.txt")).unwrap();
		let again = parse(first.commands[0].argv.clone()).unwrap();
		assert_eq!(again.commands, first.commands);
		assert_eq!(again.redirect, RedirectSpec::default());
	}

	#[test]
	fn output_truncate() {
		let pipeline = parse(words("echo hi > out.txt")).unwrap();
		assert_eq!(pipeline.redirect.output, Some(("out.txt".to_string(), OutputMode::Truncate)));
		assert_eq!(pipeline.redirect.input, None);
		assert_eq!(pipeline.commands, vec![argv("echo hi")]);
	}

	#[test]
	fn output_append() {
		let pipeline = parse(words("echo hi >> out.txt")).unwrap();
		assert_eq!(pipeline.redirect.output, Some(("out.txt".to_string(), OutputMode::Append)));
		assert_eq!(pipeline.commands, vec![argv("echo hi")]);
	}

	#[test]
	fn input_and_output_together() {
		let pipeline = parse(words("< in.txt tr a b >> out.txt")).unwrap();
		assert_eq!(pipeline.redirect.input, Some("in.txt".to_string()));
		assert_eq!(pipeline.redirect.output, Some(("out.txt".to_string(), OutputMode::Append)));
		assert_eq!(pipeline.commands, vec![argv("tr a b")]);
	}

	#[test]
	fn missing_targets() {
		assert_eq!(parse(words(">")), Err(SyntaxError::MissingTarget(">")));
		assert_eq!(parse(words("echo >>")), Err(SyntaxError::MissingTarget(">>")));
		assert_eq!(parse(words("cat <")), Err(SyntaxError::MissingTarget("<")));
		assert_eq!(parse(words("echo > | cat")), Err(SyntaxError::MissingTarget(">")));
	}

	#[test]
	fn second_redirect_of_a_direction_is_rejected() {
		assert_eq!(parse(words("echo a > x >> y")), Err(SyntaxError::DuplicateRedirect("output")));
		assert_eq!(parse(words("echo a > x > y")), Err(SyntaxError::DuplicateRedirect("output")));
		assert_eq!(parse(words("cat < x < y")), Err(SyntaxError::DuplicateRedirect("input")));
	}

	#[test]
	fn trailing_ampersand_is_background() {
		let pipeline = parse(words("sleep 1 &")).unwrap();
		assert!(pipeline.is_background);
		assert_eq!(pipeline.commands, vec![argv("sleep 1")]);
	}

	#[test]
	fn ampersand_elsewhere_is_rejected() {
		assert_eq!(parse(words("sleep & 1")), Err(SyntaxError::UnexpectedToken("&")));
		assert_eq!(parse(words("&")), Err(SyntaxError::EmptyCommand));
	}

	#[test]
	fn pipes_split_segments() {
		let pipeline = parse(words("cmd a | cmd2 b")).unwrap();
		assert_eq!(pipeline.commands, vec![argv("cmd a"), argv("cmd2 b")]);
		let pipeline = parse(words("a | b | c &")).unwrap();
		assert_eq!(pipeline.commands.len(), 3);
		assert!(pipeline.is_background);
	}

	#[test]
	fn redirects_are_line_wide_in_pipelines() {
		let pipeline = parse(words("cat < in.txt | sort | uniq > out.txt")).unwrap();
		assert_eq!(pipeline.redirect.input, Some("in.txt".to_string()));
		assert_eq!(pipeline.redirect.output, Some(("out.txt".to_string(), OutputMode::Truncate)));
		assert_eq!(pipeline.commands, vec![argv("cat"), argv("sort"), argv("uniq")]);
	}

	#[test]
	fn empty_segments_are_rejected() {
		assert_eq!(parse(words("| a")), Err(SyntaxError::EmptyCommand));
		assert_eq!(parse(words("a | | b")), Err(SyntaxError::EmptyCommand));
		assert_eq!(parse(words("a |")), Err(SyntaxError::EmptyCommand));
		assert_eq!(parse(words("< in.txt")), Err(SyntaxError::EmptyCommand));
	}

	#[test]
	fn describe_round_trips_to_job_text() {
		let pipeline = parse(words("cat < in | wc -l > out &")).unwrap();
		assert_eq!(pipeline.describe(), "cat < in | wc -l > out");
	}
}
