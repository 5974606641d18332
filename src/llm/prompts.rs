//! Prompt templates sent to the model.

pub fn analysis_prompt(prompt: &str) -> String {
    format!(
        r#"Analyze the following prompt and determine if it's a simple task that can be completed directly, or a more complex task that should be broken down into subtasks.

If it's a simple task (e.g., write a Python program to print the Fibonacci sequence), begin with "SIMPLE:", then complete the task and generate the code.

If it's a complex task, begin your response with "SUBTASKS:", then provide a numbered list of subtasks that would be necessary to complete it. Each subtask should be written as an AI prompt that can be used to generate code for that specific part of the task. Do not generate code for the subtasks at this stage.

When creating the subtask prompts, the following is vital:
- Provide all necessary context or constraints to ensure the generated code snippets will be compatible.
- Each prompt should focus on a specific part of the overall task.
- Use clear and concise language to describe the desired functionality of each subtask.
- Do not include any code in the subtask prompts.

**Prompt:** {prompt}"#
    )
}

pub fn subtask_prompt(index: usize, total: usize, overall: &str, listing: &str) -> String {
    format!(
        "This is subtask {index} of {total} for the following overall task: ---\n\n{overall}\n\nThe subtasks for this task are:\n{listing}\n\nKeep the other subtasks in mind when writing the code for this subtask, but only complete subtask #{index}\n"
    )
}

pub fn refactor_prompt(code: &str) -> String {
    format!("Please refactor the following code:\n\n{code}")
}

pub fn breakdown_prompt(prompt: &str) -> String {
    format!("Please break down the following task into smaller subtasks:\n\n{prompt}")
}

pub fn summary_prompt(prompt: &str) -> String {
    format!("Please provide a brief one-sentence summary of the following task:\n\n{prompt}")
}
