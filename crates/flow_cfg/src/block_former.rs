use flow_ir::Instr;

/// Splits a flat instruction stream into basic blocks.
///
/// A block whose first entry is a label marker keeps it there so
/// [`name_blocks`] can recover the intended name; blocks without a leading
/// label are anonymous and get a fresh `b<k>` name later.
///
/// Rules, applied in order while scanning left to right:
/// - A non-label instruction is appended to the block under construction.
/// - A terminator closes the block it was appended to.
/// - A label starts a new block; if the block under construction is
///   non-empty it is closed first (this also means a terminator
///   immediately followed by a label does not produce an empty block in
///   between — the label simply opens the next one).
/// - Any trailing non-empty block is emitted at end of input.
pub fn form_blocks(instrs: &[Instr]) -> Vec<Vec<Instr>> {
    let mut blocks = Vec::new();
    let mut current: Vec<Instr> = Vec::new();

    for instr in instrs {
        if instr.is_label() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            current.push(instr.clone());
        } else {
            let is_terminator = instr.is_terminator();
            current.push(instr.clone());
            if is_terminator {
                blocks.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Assigns a unique name to each block produced by [`form_blocks`] and
/// ensures every block ends in a terminator.
///
/// Returns the blocks in their original order, named, with any leading
/// label marker stripped (the name now carries that information) and a
/// trailing `jmp`/`ret` appended where one was missing.
pub fn name_blocks(blocks: Vec<Vec<Instr>>) -> Vec<(String, Vec<Instr>)> {
    let mut named = Vec::with_capacity(blocks.len());
    let mut next_anon = 0usize;

    for mut block in blocks {
        let name = if block.first().is_some_and(Instr::is_label) {
            let label = block.remove(0);
            label.label.unwrap_or_default()
        } else {
            let n = format!("b{next_anon}");
            next_anon += 1;
            n
        };
        named.push((name, block));
    }

    add_terminators(&mut named);
    named
}

/// Appends a `jmp` to the next block, or a `ret` if this is the last block,
/// to any block whose last instruction is not already a terminator.
fn add_terminators(blocks: &mut [(String, Vec<Instr>)]) {
    let len = blocks.len();
    for i in 0..len {
        let needs_terminator = blocks[i]
            .1
            .last()
            .is_none_or(|last| !last.is_terminator());
        if !needs_terminator {
            continue;
        }
        if i + 1 == len {
            blocks[i].1.push(Instr::ret(None));
        } else {
            let next_name = blocks[i + 1].0.clone();
            blocks[i].1.push(Instr::jmp(next_name));
        }
    }
}
