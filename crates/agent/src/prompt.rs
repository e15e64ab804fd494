//! The system prompt that opens every debugging conversation.

/// Build the preamble naming the inspected source file and the turn budget.
pub fn system_prompt(source_file_name: &str, max_turns: usize) -> String {
    format!(
        "You are a helpful assistant that can help with debugging a program with the LLDB debugger.

You have tools to help you accomplish the user's goals. The file you are inspecting is {source_file_name}.

Set breakpoints before you run the program; breakpoints set later are applied to the running session.

Sometimes the program will ask for input. Use the stdin_write tool to provide it, in exactly the format \
the program expects. For example, if the program expects a number, provide the number without any other text. \
The tool returns the debugger output after the input is provided.

You can call tools up to {max_turns} times before you respond to the user.
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_file_and_budget() {
        let prompt = system_prompt("game.c", 7);
        assert!(prompt.contains("The file you are inspecting is game.c."));
        assert!(prompt.contains("up to 7 times"));
        assert!(!prompt.contains("{max_turns}"));
    }
}
