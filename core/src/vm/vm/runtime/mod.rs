mod exec;
mod invoke;
mod math;
mod opcode;
